//! Project manifest reading.
//!
//! Only two facts are read from a `platformio.ini`: the declared environment names and where the build tool will
//! put its output. Everything else in the file belongs to the build tool.

use std::fs;
use std::path::{Path, PathBuf};

use firmcheck_core::conventions::{
    BUILD_DIR_NAME, DEFAULT_WORKSPACE_DIR, ENV_SECTION_PREFIX, MANIFEST_FILE, PLATFORMIO_SECTION,
};
use thiserror::Error;

/// Errors raised while reading a project manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("cannot read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: malformed section header")]
    Syntax { path: PathBuf, line: usize },
}

/// What the harness needs to know about one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectManifest {
    /// Declared environment names, in file order, without duplicates.
    pub environments: Vec<String>,
    /// Absolute (or project-relative, already joined) build output root.
    pub build_dir: PathBuf,
}

/// Read the manifest of a project directory.
pub trait ManifestReader {
    fn read(&self, project_dir: &Path) -> Result<ProjectManifest, ManifestError>;
}

/// Line-oriented reader for `platformio.ini`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IniManifestReader;

impl ManifestReader for IniManifestReader {
    fn read(&self, project_dir: &Path) -> Result<ProjectManifest, ManifestError> {
        let path = project_dir.join(MANIFEST_FILE);
        let source = fs::read_to_string(&path).map_err(|source| ManifestError::Io {
            path: path.clone(),
            source,
        })?;
        let parsed = parse_manifest(&source).map_err(|line| ManifestError::Syntax { path, line })?;
        Ok(parsed.into_manifest(project_dir))
    }
}

/// Raw facts parsed from manifest text, before paths are resolved.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedManifest {
    pub environments: Vec<String>,
    pub build_dir: Option<String>,
    pub workspace_dir: Option<String>,
}

impl ParsedManifest {
    /// Resolve the build directory against `project_dir`.
    ///
    /// `build_dir` wins over `workspace_dir`; the default is `.pio/build`.
    pub fn into_manifest(self, project_dir: &Path) -> ProjectManifest {
        let build_dir = match (self.build_dir, self.workspace_dir) {
            (Some(build), _) => project_dir.join(build),
            (None, Some(workspace)) => project_dir.join(workspace).join(BUILD_DIR_NAME),
            (None, None) => project_dir.join(DEFAULT_WORKSPACE_DIR).join(BUILD_DIR_NAME),
        };
        ProjectManifest {
            environments: self.environments,
            build_dir,
        }
    }
}

/// Parse manifest text.
///
/// ## Errors
///
/// Returns the 1-based line number of the first malformed section header.
pub fn parse_manifest(source: &str) -> Result<ParsedManifest, usize> {
    let mut parsed = ParsedManifest::default();
    let mut section: Option<String> = None;

    for (idx, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = line.strip_prefix('[') {
            let Some(name) = strip_inline_comment(rest).trim_end().strip_suffix(']') else {
                return Err(idx + 1);
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(idx + 1);
            }
            if let Some(env) = name.strip_prefix(ENV_SECTION_PREFIX) {
                let env = env.trim();
                if env.is_empty() {
                    return Err(idx + 1);
                }
                if !parsed.environments.iter().any(|e| e == env) {
                    parsed.environments.push(env.to_string());
                }
            }
            section = Some(name.to_string());
            continue;
        }

        // Continuation lines and options outside [platformio] are the build tool's business.
        if section.as_deref() != Some(PLATFORMIO_SECTION) || raw.starts_with([' ', '\t']) {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = strip_inline_comment(value).trim();
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "build_dir" => parsed.build_dir = Some(value.to_string()),
            "workspace_dir" => parsed.workspace_dir = Some(value.to_string()),
            _ => {}
        }
    }

    Ok(parsed)
}

/// Cut `value` at the first `;` or `#` that follows whitespace.
fn strip_inline_comment(value: &str) -> &str {
    let mut prev_is_space = false;
    for (pos, ch) in value.char_indices() {
        if prev_is_space && (ch == ';' || ch == '#') {
            return &value[..pos];
        }
        prev_is_space = ch.is_whitespace();
    }
    value
}
