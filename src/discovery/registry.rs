//! Installed platform enumeration.
//!
//! The harness only reads the registry. `FsPlatformRegistry` scans the PlatformIO core directory; tests supply
//! their own [`PlatformRegistry`] implementations.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use firmcheck_core::conventions::{
    EXAMPLES_DIR, EXAMPLES_DIR_ALT, PLATFORM_MANIFEST_FILE, PLATFORMS_DIR, UPLOADER_PACKAGE_TYPE,
};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while enumerating installed platforms.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot list platforms in {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One installed platform package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPlatform {
    /// Platform identifier (for example `atmelavr`).
    pub name: String,
    /// Package directory on disk.
    pub package_dir: PathBuf,
    /// Whether the platform targets devices (has an uploader package).
    pub embedded: bool,
}

impl InstalledPlatform {
    /// The examples directory shipped in the package.
    ///
    /// Prefers `examples/`, then `Examples/`. When neither exists the lowercase path is returned so the caller
    /// can report it.
    pub fn examples_dir(&self) -> PathBuf {
        let primary = self.package_dir.join(EXAMPLES_DIR);
        if primary.is_dir() {
            return primary;
        }
        let alt = self.package_dir.join(EXAMPLES_DIR_ALT);
        if alt.is_dir() { alt } else { primary }
    }
}

/// Source of installed platforms.
pub trait PlatformRegistry {
    fn installed(&self) -> Result<Vec<InstalledPlatform>, RegistryError>;
}

/// Registry backed by `<core_dir>/platforms/*/platform.json`.
#[derive(Debug, Clone)]
pub struct FsPlatformRegistry {
    core_dir: PathBuf,
}

impl FsPlatformRegistry {
    pub fn new(core_dir: impl Into<PathBuf>) -> Self {
        Self {
            core_dir: core_dir.into(),
        }
    }

    pub fn platforms_dir(&self) -> PathBuf {
        self.core_dir.join(PLATFORMS_DIR)
    }
}

impl PlatformRegistry for FsPlatformRegistry {
    fn installed(&self) -> Result<Vec<InstalledPlatform>, RegistryError> {
        let dir = self.platforms_dir();
        if !dir.is_dir() {
            tracing::debug!(path = %dir.display(), "no platforms directory");
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir).map_err(|source| RegistryError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut platforms = Vec::new();
        for entry in entries.flatten() {
            let package_dir = entry.path();
            if !package_dir.is_dir() {
                continue;
            }
            match read_platform(&package_dir) {
                Ok(platform) => platforms.push(platform),
                Err(reason) => {
                    tracing::warn!(path = %package_dir.display(), "skipping platform package: {}", reason);
                }
            }
        }

        platforms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(platforms)
    }
}

#[derive(Debug, Deserialize)]
struct PlatformJson {
    name: String,
    #[serde(default)]
    packages: BTreeMap<String, PackageOptions>,
}

#[derive(Debug, Default, Deserialize)]
struct PackageOptions {
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

fn read_platform(package_dir: &Path) -> Result<InstalledPlatform, String> {
    let path = package_dir.join(PLATFORM_MANIFEST_FILE);
    let source = fs::read_to_string(&path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    parse_platform_json(&source, package_dir)
}

/// Build an [`InstalledPlatform`] from `platform.json` contents.
pub fn parse_platform_json(source: &str, package_dir: &Path) -> Result<InstalledPlatform, String> {
    let manifest: PlatformJson =
        serde_json::from_str(source).map_err(|e| format!("invalid {}: {}", PLATFORM_MANIFEST_FILE, e))?;
    let embedded = manifest
        .packages
        .values()
        .any(|opts| opts.kind.as_deref() == Some(UPLOADER_PACKAGE_TYPE));
    Ok(InstalledPlatform {
        name: manifest.name,
        package_dir: package_dir.to_path_buf(),
        embedded,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_uploader_package_marks_embedded() {
        let json = r#"{
            "name": "atmelavr",
            "packages": {
                "toolchain-atmelavr": { "type": "toolchain", "version": "~1.70300.0" },
                "tool-avrdude": { "type": "uploader", "optional": true }
            }
        }"#;
        let platform = parse_platform_json(json, Path::new("/pkgs/atmelavr")).unwrap();
        assert_eq!(platform.name, "atmelavr");
        assert!(platform.embedded);
        assert_eq!(platform.package_dir, PathBuf::from("/pkgs/atmelavr"));
    }

    #[test]
    fn test_desktop_platform_is_not_embedded() {
        let json = r#"{ "name": "native", "packages": { "toolchain-gcc": { "type": "toolchain" } } }"#;
        assert!(!parse_platform_json(json, Path::new("/x")).unwrap().embedded);

        let bare = r#"{ "name": "native" }"#;
        assert!(!parse_platform_json(bare, Path::new("/x")).unwrap().embedded);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(parse_platform_json("{ nope", Path::new("/x")).is_err());
        assert!(parse_platform_json(r#"{ "packages": {} }"#, Path::new("/x")).is_err());
    }
}
