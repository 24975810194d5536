//! Harness configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then command-line flags (applied by the
//! CLI), then the constrained-CI environment variable.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use firmcheck_core::DEFAULT_SAMPLE_SIZE;
use firmcheck_core::SampleCap;
use firmcheck_core::conventions::{
    BUILD_PROGRAM, CONSTRAINED_CI_ENV, CORE_DIR_ENV, DEFAULT_CORE_DIR_NAME, EXAMPLES_DIR,
};
use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::discovery::policy::{ExclusionPolicy, ExclusionRule};

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "firmcheck.toml";

/// Errors raised while loading configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    #[diagnostic(code(firmcheck::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {message}")]
    #[diagnostic(
        code(firmcheck::config::parse),
        help("known keys: examples_root, sample_size, build_program, platforms, core_dir, [[exclude]]")
    )]
    Parse { path: PathBuf, message: String },

    #[error("exclusion rule #{index} has an empty platform name")]
    #[diagnostic(code(firmcheck::config::exclude), help("set `platform = \"<id>\"` in every [[exclude]] table"))]
    EmptyExclusion { index: usize },
}

/// On-disk shape of `firmcheck.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub examples_root: Option<PathBuf>,
    pub sample_size: Option<usize>,
    pub build_program: Option<PathBuf>,
    pub platforms: Option<bool>,
    pub core_dir: Option<PathBuf>,
    pub exclude: Option<Vec<ExclusionRule>>,
}

/// Effective settings for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Fixed local examples root.
    pub examples_root: PathBuf,
    /// Additional roots searched like the local one.
    pub extra_roots: Vec<PathBuf>,
    /// Per-root sample cap outside constrained CI.
    pub sample_size: usize,
    /// Sample one project per root.
    pub constrained: bool,
    /// Build tool program.
    pub build_program: PathBuf,
    /// Include installed platform example roots.
    pub platforms: bool,
    /// PlatformIO core directory; `None` when it cannot be located.
    pub core_dir: Option<PathBuf>,
    pub exclusions: ExclusionPolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            examples_root: PathBuf::from(EXAMPLES_DIR),
            extra_roots: Vec::new(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            constrained: false,
            build_program: PathBuf::from(BUILD_PROGRAM),
            platforms: true,
            core_dir: None,
            exclusions: ExclusionPolicy::default(),
        }
    }
}

impl HarnessConfig {
    /// Load defaults plus `path`, or plus `firmcheck.toml` in the working directory if it exists.
    ///
    /// ## Errors
    ///
    /// Returns an error if an explicitly named file is missing, or any file is unreadable or invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let file = match path {
            Some(path) => Some(read_config_file(path)?),
            None => {
                let implicit = Path::new(DEFAULT_CONFIG_FILE);
                if implicit.is_file() {
                    Some(read_config_file(implicit)?)
                } else {
                    None
                }
            }
        };
        if let Some(file) = file {
            config.apply_file(file)?;
        }
        config.core_dir = config.core_dir.take().or_else(default_core_dir);
        Ok(config)
    }

    /// Overlay values from a parsed config file.
    pub fn apply_file(&mut self, file: ConfigFile) -> Result<(), ConfigError> {
        if let Some(root) = file.examples_root {
            self.examples_root = root;
        }
        if let Some(size) = file.sample_size {
            self.sample_size = size;
        }
        if let Some(program) = file.build_program {
            self.build_program = program;
        }
        if let Some(platforms) = file.platforms {
            self.platforms = platforms;
        }
        if let Some(core_dir) = file.core_dir {
            self.core_dir = Some(core_dir);
        }
        if let Some(rules) = file.exclude {
            if let Some(index) = rules.iter().position(|r| r.platform.trim().is_empty()) {
                return Err(ConfigError::EmptyExclusion { index: index + 1 });
            }
            self.exclusions = ExclusionPolicy::new(rules);
        }
        Ok(())
    }

    /// Turn on constrained sampling when the CI variable was found, whatever its value (empty included).
    pub fn apply_env_value(&mut self, ci_marker: Option<&OsStr>) {
        if ci_marker.is_some() {
            tracing::info!("{} is set, sampling one project per root", CONSTRAINED_CI_ENV);
            self.constrained = true;
        }
    }

    pub fn sample_cap(&self) -> SampleCap {
        SampleCap::new(self.sample_size, self.constrained)
    }
}

/// Parse `firmcheck.toml` text.
pub fn parse_config(source: &str, path: &Path) -> Result<ConfigFile, ConfigError> {
    toml::from_str(source).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&source, path)
}

/// `$PLATFORMIO_CORE_DIR`, else `~/.platformio`.
pub fn default_core_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(CORE_DIR_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"))?;
    Some(PathBuf::from(home).join(DEFAULT_CORE_DIR_NAME))
}
