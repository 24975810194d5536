//! Project discovery and sampling
//!
//! ## Pipeline
//!
//! 1. [`resolve_roots`] builds the [`RootSet`]: the local examples root plus one root per qualifying installed
//!    platform.
//! 2. [`discover_candidates`] walks one root and returns every directory holding a manifest and no skip marker.
//! 3. [`sample_candidates`] shuffles those and keeps at most [`SampleCap::take`] of them.
//! 4. [`build_matrix`] runs 2 and 3 for every root and sorts the union into the [`TestMatrix`].
//!
//! Randomness is always injected (`R: Rng`), so a seeded generator makes a session reproducible.

pub mod policy;
pub mod registry;

use std::path::{Path, PathBuf};

use firmcheck_core::SampleCap;
use firmcheck_core::conventions::{MANIFEST_FILE, SKIP_MARKER_FILE};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;
use walkdir::WalkDir;

use self::policy::ExclusionPolicy;
use self::registry::{PlatformRegistry, RegistryError};

/// Errors that abort discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// An installed embedded platform ships no examples directory. This is a packaging inconsistency.
    #[error("platform '{platform}' has no examples directory at {path}")]
    MissingExamplesDir { platform: String, path: PathBuf },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Where a root came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootOrigin {
    /// The repository's own examples directory (not validated).
    Local,
    /// An extra root given on the command line.
    Extra,
    /// The examples directory of an installed platform.
    Platform(String),
}

/// One directory to search for projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub path: PathBuf,
    pub origin: RootOrigin,
}

impl Root {
    pub fn label(&self) -> String {
        match &self.origin {
            RootOrigin::Local => "local".to_string(),
            RootOrigin::Extra => "extra".to_string(),
            RootOrigin::Platform(name) => format!("platform:{}", name),
        }
    }
}

/// Ordered collection of roots searched in one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSet {
    roots: Vec<Root>,
}

impl RootSet {
    /// Start from the fixed local examples root.
    pub fn new(local: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![Root {
                path: local.into(),
                origin: RootOrigin::Local,
            }],
        }
    }

    pub fn push(&mut self, path: impl Into<PathBuf>, origin: RootOrigin) {
        self.roots.push(Root {
            path: path.into(),
            origin,
        });
    }

    pub fn roots(&self) -> &[Root] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Add one root per installed embedded platform that the policy does not exclude.
///
/// ## Errors
///
/// Fails when the registry cannot be read, or when a qualifying platform has no examples directory.
#[tracing::instrument(skip_all, fields(local = %local.display()))]
pub fn resolve_roots(
    local: &Path,
    registry: Option<&dyn PlatformRegistry>,
    policy: &ExclusionPolicy,
) -> Result<RootSet, DiscoveryError> {
    let mut roots = RootSet::new(local);
    let Some(registry) = registry else {
        return Ok(roots);
    };

    for platform in registry.installed()? {
        if !platform.embedded {
            tracing::debug!(platform = %platform.name, "skipping non-embedded platform");
            continue;
        }
        if let Some(rule) = policy.excludes(&platform.name) {
            tracing::info!(platform = %platform.name, reason = %rule.reason, "platform excluded");
            continue;
        }
        let examples = platform.examples_dir();
        if !examples.is_dir() {
            return Err(DiscoveryError::MissingExamplesDir {
                platform: platform.name,
                path: examples,
            });
        }
        roots.push(examples, RootOrigin::Platform(platform.name));
    }

    Ok(roots)
}

/// Whether `dir` directly holds the manifest and no skip marker.
pub fn is_candidate(dir: &Path) -> bool {
    dir.join(MANIFEST_FILE).is_file() && !dir.join(SKIP_MARKER_FILE).is_file()
}

/// Walk `root` and return every candidate project directory.
///
/// Qualifying directories are not pruned: nested projects below them are found independently. A missing root
/// yields no candidates. The order is the walk order (sorted by file name at each level).
#[tracing::instrument(skip_all, fields(root = %root.display()))]
pub fn discover_candidates(root: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(root = %root.display(), "skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if is_candidate(entry.path()) {
            tracing::debug!(project = %entry.path().display(), "candidate");
            candidates.push(entry.into_path());
        }
    }

    candidates
}

/// Shuffle `candidates` and keep the first `cap.take(len)` of them.
pub fn sample_candidates<R: Rng + ?Sized>(mut candidates: Vec<PathBuf>, cap: SampleCap, rng: &mut R) -> Vec<PathBuf> {
    candidates.shuffle(rng);
    let keep = cap.take(candidates.len());
    candidates.truncate(keep);
    candidates
}

/// Projects selected from one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootSample {
    pub root: Root,
    pub discovered: usize,
    pub selected: Vec<PathBuf>,
}

/// The sorted, de-duplicated list of projects to build in one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestMatrix {
    entries: Vec<PathBuf>,
}

impl TestMatrix {
    /// Sort by path string and drop duplicates.
    pub fn from_selected(mut entries: Vec<PathBuf>) -> Self {
        entries.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
        entries.dedup();
        Self { entries }
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only entries whose path contains `keyword`.
    pub fn filter(self, keyword: &str) -> Self {
        let entries = self
            .entries
            .into_iter()
            .filter(|p| p.to_string_lossy().contains(keyword))
            .collect();
        Self { entries }
    }
}

impl IntoIterator for TestMatrix {
    type Item = PathBuf;
    type IntoIter = std::vec::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Discover and sample every root, returning per-root detail and the combined matrix.
pub fn build_matrix<R: Rng + ?Sized>(roots: &RootSet, cap: SampleCap, rng: &mut R) -> (Vec<RootSample>, TestMatrix) {
    let mut samples = Vec::with_capacity(roots.len());
    let mut selected = Vec::new();

    for root in roots.roots() {
        let candidates = discover_candidates(&root.path);
        let discovered = candidates.len();
        let picked = sample_candidates(candidates, cap, rng);
        tracing::info!(
            root = %root.path.display(),
            origin = %root.label(),
            discovered,
            selected = picked.len(),
            "sampled root"
        );
        selected.extend(picked.iter().cloned());
        samples.push(RootSample {
            root: root.clone(),
            discovered,
            selected: picked,
        });
    }

    (samples, TestMatrix::from_selected(selected))
}
