//! Machine-readable session report (`--report PATH`).

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::verify::ProjectOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Passed,
    Failed,
}

/// One test matrix entry in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub project: String,
    pub environment: Option<String>,
    pub status: EntryStatus,
    pub duration_ms: u128,
    pub message: Option<String>,
    pub artifacts: Vec<String>,
}

impl From<&ProjectOutcome> for EntryReport {
    fn from(outcome: &ProjectOutcome) -> Self {
        let (status, message, artifacts) = match &outcome.result {
            Ok(envs) => (
                EntryStatus::Passed,
                None,
                envs.iter()
                    .flat_map(|env| env.artifacts.iter())
                    .map(|a| a.path.display().to_string())
                    .collect(),
            ),
            Err(failure) => (EntryStatus::Failed, Some(failure.to_string()), Vec::new()),
        };
        Self {
            project: outcome.project.display().to_string(),
            environment: outcome.environment.clone(),
            status,
            duration_ms: outcome.duration.as_millis(),
            message,
            artifacts,
        }
    }
}

/// Whole-session report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub seed: Option<u64>,
    pub constrained: bool,
    pub duration_ms: u128,
    pub passed: usize,
    pub failed: usize,
    pub entries: Vec<EntryReport>,
}

impl SessionReport {
    pub fn new(seed: Option<u64>, constrained: bool, duration: Duration, outcomes: &[ProjectOutcome]) -> Self {
        let entries: Vec<EntryReport> = outcomes.iter().map(EntryReport::from).collect();
        let passed = entries.iter().filter(|e| e.status == EntryStatus::Passed).count();
        Self {
            seed,
            constrained,
            duration_ms: duration.as_millis(),
            passed,
            failed: entries.len() - passed,
            entries,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::other)?;
        fs::write(path, json)
    }
}
