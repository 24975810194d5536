#![forbid(unsafe_code)]
//! firmcheck: build-verification harness for PlatformIO example projects
//!
//! A session discovers example projects under a set of roots, samples a few from each root, builds every
//! sampled project once with the external build tool and checks that firmware artifacts were produced.
//!
//! ## Layout
//!
//! - [`discovery`] - root resolution, candidate walk, per-root sampling, test matrix
//! - [`verify`] - build invocation and artifact checks
//! - [`manifest`] - the two facts read from `platformio.ini`
//! - [`config`] - layered settings and the platform exclusion policy
//! - [`report`] - JSON session report
//! - [`cli`] - the `firmcheck` command line
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod manifest;
pub mod report;
pub mod verify;
pub mod version;

pub use config::HarnessConfig;
pub use discovery::{RootSet, TestMatrix, build_matrix, discover_candidates, resolve_roots, sample_candidates};
pub use manifest::{IniManifestReader, ManifestReader, ProjectManifest};
pub use verify::build::{BuildCommand, BuildOutcome, ProcessBuildCommand};
pub use verify::{ProjectFailure, ProjectOutcome, ProjectRunner, verify_build_output};
