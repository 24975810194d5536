//! Provide shared, pure vocabulary and selection helpers for the firmcheck harness.
//!
//! This crate is intentionally small and dependency-free. It holds the well-known names that both discovery and
//! verification agree on (manifest file, skip marker, artifact names, environment keys) together with the
//! arithmetic of per-root sampling.
//!
//! ## Notes
//!
//! - **No IO**, no global state, no randomness. Callers own the filesystem walk and the random source.

pub mod artifacts;
pub mod conventions;

/// Default number of projects sampled from each root.
pub const DEFAULT_SAMPLE_SIZE: usize = 3;

/// Number of projects sampled from each root in a constrained CI environment.
pub const CONSTRAINED_SAMPLE_SIZE: usize = 1;

/// Describe how many projects a root may contribute to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleCap {
    /// Take up to `n` projects (a zero cap is treated as one).
    Limit(usize),
    /// Constrained CI: take exactly one project when any exist.
    Constrained,
}

impl SampleCap {
    /// Resolve the cap from the configured size and the constrained flag.
    pub fn new(configured: usize, constrained: bool) -> Self {
        if constrained {
            Self::Constrained
        } else {
            Self::Limit(configured)
        }
    }

    /// The largest sample this cap allows, never below one.
    pub fn limit(self) -> usize {
        match self {
            Self::Limit(n) => n.max(1),
            Self::Constrained => CONSTRAINED_SAMPLE_SIZE,
        }
    }

    /// Number of projects taken from a root with `available` candidates.
    ///
    /// Always `min(available, limit)`.
    pub fn take(self, available: usize) -> usize {
        available.min(self.limit())
    }
}

impl Default for SampleCap {
    fn default() -> Self {
        Self::Limit(DEFAULT_SAMPLE_SIZE)
    }
}
