//! Build execution and artifact verification
//!
//! [`ProjectRunner::run`] performs one test matrix entry:
//!
//! 1. read the manifest (environments, build directory),
//! 2. remove a stale build directory,
//! 3. pick one environment at random and build it,
//! 4. on a zero status, check every environment directory for a non-empty `firmware.elf` plus at least one
//!    non-empty `firmware*.bin` / `firmware*.hex`.
//!
//! The project directory is passed explicitly to every step; nothing here touches the process working
//! directory. There is no retry: the first failure is the entry's result.

pub mod build;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use firmcheck_core::artifacts::{self, ArtifactKind, PRIMARY_ARTIFACT};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use self::build::{BuildCommand, BuildOutcome};
use crate::manifest::{ManifestError, ManifestReader};

/// A problem with one environment's artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactFailure {
    #[error("{environment}: firmware.elf not found at {path}")]
    MissingElf { environment: String, path: PathBuf },

    #[error("{environment}: missing firmware file (no firmware*.bin or firmware*.hex in {dir})")]
    MissingFirmware { environment: String, dir: PathBuf },

    #[error("{environment}: empty artifact {path} (0 bytes)")]
    EmptyArtifact { environment: String, path: PathBuf },
}

/// All artifact problems found in one build output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFailures(pub Vec<ArtifactFailure>);

impl fmt::Display for ArtifactFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(|failure| format!("  - {}", failure)).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

/// Why a test matrix entry failed.
#[derive(Debug, Error)]
pub enum ProjectFailure {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("project declares no environments")]
    NoEnvironments,

    #[error("cannot remove stale build directory {path}: {source}")]
    Clean {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot launch build for environment '{environment}': {source}")]
    Launch {
        environment: String,
        #[source]
        source: io::Error,
    },

    #[error("build of environment '{environment}' exited with status {}\n{}", .outcome.status, .outcome.output)]
    BuildFailed { environment: String, outcome: BuildOutcome },

    #[error("build reported success but output directory is absent: {path}")]
    OutputDirMissing { path: PathBuf },

    #[error("cannot inspect build output: {0}")]
    Inspect(#[source] io::Error),

    #[error("artifact verification failed:\n{0}")]
    Artifacts(ArtifactFailures),
}

/// One firmware file found for an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub size: u64,
}

/// Verified artifacts of one environment directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltEnvironment {
    pub name: String,
    pub artifacts: Vec<Artifact>,
}

/// Result of one test matrix entry.
#[derive(Debug)]
pub struct ProjectOutcome {
    pub project: PathBuf,
    /// The environment that was built, once one was chosen.
    pub environment: Option<String>,
    pub duration: Duration,
    pub result: Result<Vec<BuiltEnvironment>, ProjectFailure>,
}

impl ProjectOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs and verifies one project at a time.
pub struct ProjectRunner<'a> {
    build: &'a dyn BuildCommand,
    manifests: &'a dyn ManifestReader,
}

impl<'a> ProjectRunner<'a> {
    pub fn new(build: &'a dyn BuildCommand, manifests: &'a dyn ManifestReader) -> Self {
        Self { build, manifests }
    }

    /// Build and verify `project`, choosing its environment with `rng`.
    #[tracing::instrument(skip_all, fields(project = %project.display()))]
    pub fn run<R: Rng + ?Sized>(&self, project: &Path, rng: &mut R) -> ProjectOutcome {
        let started = Instant::now();
        let mut environment = None;
        let result = self.run_inner(project, rng, &mut environment);
        ProjectOutcome {
            project: project.to_path_buf(),
            environment,
            duration: started.elapsed(),
            result,
        }
    }

    fn run_inner<R: Rng + ?Sized>(
        &self,
        project: &Path,
        rng: &mut R,
        chosen: &mut Option<String>,
    ) -> Result<Vec<BuiltEnvironment>, ProjectFailure> {
        let manifest = self.manifests.read(project)?;
        let build_dir = manifest.build_dir;

        clean_build_dir(&build_dir)?;

        let environment = manifest
            .environments
            .choose(rng)
            .cloned()
            .ok_or(ProjectFailure::NoEnvironments)?;
        *chosen = Some(environment.clone());
        tracing::info!(environment = %environment, "building");

        let outcome = self
            .build
            .build(project, &environment)
            .map_err(|source| ProjectFailure::Launch {
                environment: environment.clone(),
                source,
            })?;
        tracing::debug!(status = outcome.status, "build finished");
        if !outcome.success() {
            return Err(ProjectFailure::BuildFailed { environment, outcome });
        }

        verify_build_output(&build_dir)
    }
}

/// Remove a build directory left over from an earlier run. A missing directory is fine.
pub fn clean_build_dir(build_dir: &Path) -> Result<(), ProjectFailure> {
    if !build_dir.is_dir() {
        return Ok(());
    }
    tracing::debug!(path = %build_dir.display(), "removing stale build directory");
    fs::remove_dir_all(build_dir).map_err(|source| ProjectFailure::Clean {
        path: build_dir.to_path_buf(),
        source,
    })
}

/// Check every environment directory directly under `build_dir`.
///
/// Problems in all environments are collected before failing.
pub fn verify_build_output(build_dir: &Path) -> Result<Vec<BuiltEnvironment>, ProjectFailure> {
    if !build_dir.is_dir() {
        return Err(ProjectFailure::OutputDirMissing {
            path: build_dir.to_path_buf(),
        });
    }

    let mut env_dirs = Vec::new();
    for entry in fs::read_dir(build_dir).map_err(ProjectFailure::Inspect)? {
        let path = entry.map_err(ProjectFailure::Inspect)?.path();
        if path.is_dir() {
            env_dirs.push(path);
        }
    }
    env_dirs.sort();

    let mut built = Vec::with_capacity(env_dirs.len());
    let mut failures = Vec::new();
    for dir in env_dirs {
        match verify_environment(&dir).map_err(ProjectFailure::Inspect)? {
            Ok(env) => built.push(env),
            Err(mut problems) => failures.append(&mut problems),
        }
    }

    if failures.is_empty() {
        Ok(built)
    } else {
        Err(ProjectFailure::Artifacts(ArtifactFailures(failures)))
    }
}

/// Verify one environment directory.
///
/// The outer `io::Result` is for unreadable directories; the inner one carries artifact problems.
pub fn verify_environment(dir: &Path) -> io::Result<Result<BuiltEnvironment, Vec<ArtifactFailure>>> {
    let environment = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut failures = Vec::new();
    let mut found = Vec::new();

    let elf = dir.join(PRIMARY_ARTIFACT);
    if elf.is_file() {
        found.push((ArtifactKind::Elf, elf));
    } else {
        failures.push(ArtifactFailure::MissingElf {
            environment: environment.clone(),
            path: elf,
        });
    }

    let mut secondary = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let kind = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(artifacts::secondary_kind);
        if let Some(kind) = kind {
            secondary.push((kind, path));
        }
    }
    secondary.sort_by(|a, b| a.1.cmp(&b.1));

    if secondary.is_empty() {
        failures.push(ArtifactFailure::MissingFirmware {
            environment: environment.clone(),
            dir: dir.to_path_buf(),
        });
    }
    found.extend(secondary);

    let mut artifacts = Vec::with_capacity(found.len());
    for (kind, path) in found {
        let size = fs::metadata(&path)?.len();
        if size == 0 {
            failures.push(ArtifactFailure::EmptyArtifact {
                environment: environment.clone(),
                path,
            });
        } else {
            artifacts.push(Artifact { kind, path, size });
        }
    }

    if failures.is_empty() {
        Ok(Ok(BuiltEnvironment {
            name: environment,
            artifacts,
        }))
    } else {
        Ok(Err(failures))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn env_dir(root: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for (file, bytes) in files {
            fs::write(dir.join(file), bytes).unwrap();
        }
        dir
    }

    #[test]
    fn test_complete_environment_passes() {
        let tmp = tempfile::tempdir().unwrap();
        env_dir(tmp.path(), "uno", &[("firmware.elf", b"ELF"), ("firmware.hex", b":00")]);
        let built = verify_build_output(tmp.path()).unwrap();
        assert_eq!(built.len(), 1);
        assert_eq!(built[0].name, "uno");
        let kinds: Vec<ArtifactKind> = built[0].artifacts.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ArtifactKind::Elf, ArtifactKind::Hex]);
    }

    #[test]
    fn test_missing_output_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let err = verify_build_output(&tmp.path().join("absent")).unwrap_err();
        assert!(matches!(err, ProjectFailure::OutputDirMissing { .. }));
    }

    #[test]
    fn test_missing_firmware_message() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = env_dir(tmp.path(), "nano", &[("firmware.elf", b"ELF"), ("firmware.map", b"m")]);
        let failures = verify_environment(&dir).unwrap().unwrap_err();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].to_string().contains("missing firmware file"));
    }

    #[test]
    fn test_zero_byte_elf_is_empty_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = env_dir(tmp.path(), "due", &[("firmware.elf", b""), ("firmware.bin", b"x")]);
        let failures = verify_environment(&dir).unwrap().unwrap_err();
        assert!(matches!(&failures[..], [ArtifactFailure::EmptyArtifact { path, .. }] if path.ends_with("firmware.elf")));
    }

    #[test]
    fn test_loose_files_in_build_dir_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("project.checksum"), b"abc").unwrap();
        env_dir(tmp.path(), "uno", &[("firmware.elf", b"ELF"), ("firmware.bin", b"B")]);
        assert_eq!(verify_build_output(tmp.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_clean_missing_dir_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        clean_build_dir(&tmp.path().join("nothing")).unwrap();
    }
}
