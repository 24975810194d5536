//! Firmware artifact naming rules.
//!
//! A built environment directory must contain [`PRIMARY_ARTIFACT`] plus at least one file matching
//! `firmware*.bin` or `firmware*.hex`.

/// The linked image every environment must produce.
pub const PRIMARY_ARTIFACT: &str = "firmware.elf";

/// Common stem of all firmware artifacts.
pub const ARTIFACT_STEM: &str = "firmware";

/// Extensions accepted as secondary (flashable) artifacts, in lookup order.
pub const SECONDARY_EXTENSIONS: &[&str] = &["bin", "hex"];

/// Classify an artifact file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Elf,
    Bin,
    Hex,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Elf => "elf",
            Self::Bin => "bin",
            Self::Hex => "hex",
        }
    }

    /// Inverse of [`ArtifactKind::extension`].
    pub fn from_extension(ext: &str) -> Option<Self> {
        [Self::Elf, Self::Bin, Self::Hex].into_iter().find(|kind| kind.extension() == ext)
    }
}

/// Return the secondary artifact kind if `file_name` matches `firmware*.bin` or `firmware*.hex`.
///
/// Matching is case-sensitive, like a shell glob on Linux.
pub fn secondary_kind(file_name: &str) -> Option<ArtifactKind> {
    let rest = file_name.strip_prefix(ARTIFACT_STEM)?;
    let (_, ext) = rest.rsplit_once('.')?;
    SECONDARY_EXTENSIONS
        .iter()
        .find(|candidate| **candidate == ext)
        .and_then(|candidate| ArtifactKind::from_extension(candidate))
}
