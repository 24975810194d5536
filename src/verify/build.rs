//! Build tool invocation.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use firmcheck_core::conventions::{BUILD_PROGRAM, BUILD_SUBCOMMAND, ENVIRONMENT_FLAG};

/// Status and combined output of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Process exit status; `-1` when the process was killed by a signal.
    pub status: i32,
    /// Captured stdout followed by stderr.
    pub output: String,
}

impl BuildOutcome {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Run one build of `environment` inside `project_dir`.
///
/// Implementations must not change the process working directory.
pub trait BuildCommand {
    fn build(&self, project_dir: &Path, environment: &str) -> io::Result<BuildOutcome>;
}

/// Spawns `<program> run -e <environment>` with the project as the child's working directory.
#[derive(Debug, Clone)]
pub struct ProcessBuildCommand {
    program: PathBuf,
}

impl ProcessBuildCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for ProcessBuildCommand {
    fn default() -> Self {
        Self::new(BUILD_PROGRAM)
    }
}

impl BuildCommand for ProcessBuildCommand {
    fn build(&self, project_dir: &Path, environment: &str) -> io::Result<BuildOutcome> {
        let output = Command::new(&self.program)
            .arg(BUILD_SUBCOMMAND)
            .arg(ENVIRONMENT_FLAG)
            .arg(environment)
            .current_dir(project_dir)
            .stdin(Stdio::null())
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(BuildOutcome {
            status: output.status.code().unwrap_or(-1),
            output: format!("{}\n{}", stdout, stderr),
        })
    }
}
