//! Data-driven platform exclusion.
//!
//! Rules are plain records so the list can live in a config file. A rule with an empty `os` list applies on
//! every operating system.

use serde::{Deserialize, Serialize};

/// One excluded platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExclusionRule {
    /// Platform identifier, compared exactly.
    pub platform: String,
    /// Operating-system families (`std::env::consts::OS` values) the rule is limited to.
    #[serde(default)]
    pub os: Vec<String>,
    /// Why the platform is skipped; shown in logs.
    pub reason: String,
}

impl ExclusionRule {
    pub fn new(platform: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            os: Vec::new(),
            reason: reason.into(),
        }
    }

    pub fn on_os(mut self, os: impl Into<String>) -> Self {
        self.os.push(os.into());
        self
    }

    fn matches(&self, platform: &str, os: &str) -> bool {
        self.platform == platform && (self.os.is_empty() || self.os.iter().any(|o| o == os))
    }
}

/// Ordered set of exclusion rules; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionPolicy {
    rules: Vec<ExclusionRule>,
}

impl ExclusionPolicy {
    pub fn new(rules: Vec<ExclusionRule>) -> Self {
        Self { rules }
    }

    /// A policy that excludes nothing.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    /// Return the matching rule for `platform` on the host operating system.
    pub fn excludes(&self, platform: &str) -> Option<&ExclusionRule> {
        self.excludes_on(platform, std::env::consts::OS)
    }

    /// Return the matching rule for `platform` on the given operating-system family.
    pub fn excludes_on(&self, platform: &str, os: &str) -> Option<&ExclusionRule> {
        self.rules.iter().find(|rule| rule.matches(platform, os))
    }
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::new(vec![
            ExclusionRule::new("intel_mcs51", "sdcc requires CXXABI_1.3.9, missing from the host libstdc++")
                .on_os("linux"),
            ExclusionRule::new("ststm8", "permanently excluded from example builds"),
        ])
    }
}
