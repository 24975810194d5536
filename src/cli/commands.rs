//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::ffi::OsStr;
use std::path::Path;

use firmcheck_core::conventions::CONSTRAINED_CI_ENV;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::HarnessConfig;
use crate::discovery::registry::{FsPlatformRegistry, PlatformRegistry};
use crate::discovery::{self, RootOrigin, RootSample, RootSet, TestMatrix};
use crate::manifest::IniManifestReader;
use crate::report::SessionReport;
use crate::verify::ProjectRunner;
use crate::verify::build::ProcessBuildCommand;

use super::session::{ConsoleReporter, SessionReporter, SessionSummary, run_session};
use super::{CliError, CliResult, ExitCode, RunArgs, SelectionArgs};

/// A selected test matrix together with the state needed to execute it.
pub struct PreparedSession {
    pub config: HarnessConfig,
    pub seed: Option<u64>,
    pub rng: StdRng,
    pub samples: Vec<RootSample>,
    pub matrix: TestMatrix,
}

/// Merge config file, flags and the process environment into one configuration.
pub fn resolve_config(args: &SelectionArgs) -> CliResult<HarnessConfig> {
    resolve_config_with_env(args, std::env::var_os(CONSTRAINED_CI_ENV).as_deref())
}

/// Like [`resolve_config`], with the constrained-CI variable already looked up.
pub fn resolve_config_with_env(args: &SelectionArgs, ci_marker: Option<&OsStr>) -> CliResult<HarnessConfig> {
    let mut config = HarnessConfig::load(args.config.as_deref())
        .map_err(|e| CliError::failure(format!("{:?}", miette::Report::new(e))))?;

    if let Some(root) = &args.examples_root {
        config.examples_root = root.clone();
    }
    config.extra_roots.extend(args.roots.iter().cloned());
    if args.no_platforms {
        config.platforms = false;
    }
    if let Some(core_dir) = &args.core_dir {
        config.core_dir = Some(core_dir.clone());
    }
    if let Some(size) = args.sample_size {
        config.sample_size = size;
    }
    if args.constrained {
        config.constrained = true;
    }
    config.apply_env_value(ci_marker);
    Ok(config)
}

/// Resolve roots and sample the test matrix.
pub fn prepare_session(args: &SelectionArgs) -> CliResult<PreparedSession> {
    prepare_session_with_env(args, std::env::var_os(CONSTRAINED_CI_ENV).as_deref())
}

/// Like [`prepare_session`], with the constrained-CI variable already looked up.
pub fn prepare_session_with_env(args: &SelectionArgs, ci_marker: Option<&OsStr>) -> CliResult<PreparedSession> {
    let config = resolve_config_with_env(args, ci_marker)?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let registry = match (&config.core_dir, config.platforms) {
        (Some(core_dir), true) => Some(FsPlatformRegistry::new(core_dir)),
        (None, true) => {
            tracing::warn!("PlatformIO core directory not found; searching local roots only");
            None
        }
        (_, false) => None,
    };
    let mut roots = collect_roots(&config, registry.as_ref().map(|r| r as &dyn PlatformRegistry))?;
    for extra in &config.extra_roots {
        roots.push(extra.clone(), RootOrigin::Extra);
    }

    let (samples, matrix) = discovery::build_matrix(&roots, config.sample_cap(), &mut rng);
    let matrix = match &args.filter {
        Some(keyword) => matrix.filter(keyword),
        None => matrix,
    };

    Ok(PreparedSession {
        config,
        seed: args.seed,
        rng,
        samples,
        matrix,
    })
}

fn collect_roots(config: &HarnessConfig, registry: Option<&dyn PlatformRegistry>) -> CliResult<RootSet> {
    discovery::resolve_roots(&config.examples_root, registry, &config.exclusions)
        .map_err(|e| CliError::failure(format!("error: {}", e)))
}

/// `firmcheck list`: print one selected project per line.
pub fn list_projects(args: &SelectionArgs) -> CliResult<ExitCode> {
    let session = prepare_session(args)?;

    for sample in &session.samples {
        eprintln!(
            "{}: {} ({} found, {} selected)",
            sample.root.label(),
            sample.root.path.display(),
            sample.discovered,
            sample.selected.len()
        );
    }
    for project in session.matrix.entries() {
        println!("{}", project.display());
    }
    Ok(ExitCode::SUCCESS)
}

/// `firmcheck run`: build and verify every selected project.
pub fn run_projects(args: &RunArgs) -> CliResult<ExitCode> {
    let PreparedSession {
        mut config,
        seed,
        mut rng,
        samples,
        matrix,
    } = prepare_session(&args.selection)?;
    if let Some(program) = &args.program {
        config.build_program = program.clone();
    }

    let build = ProcessBuildCommand::new(&config.build_program);
    let manifests = IniManifestReader;
    let runner = ProjectRunner::new(&build, &manifests);
    let mut reporter = ConsoleReporter::new(args.verbose);
    reporter.on_roots_sampled(&samples);

    let summary = run_session(&matrix, &runner, &mut rng, &mut reporter);

    if let Some(path) = &args.report {
        write_report(path, seed, config.constrained, &summary)?;
    }

    if summary.failed() > 0 {
        // Summary already printed
        Err(CliError::new("", ExitCode::FAILURE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn write_report(path: &Path, seed: Option<u64>, constrained: bool, summary: &SessionSummary) -> CliResult<()> {
    SessionReport::new(seed, constrained, summary.duration, &summary.outcomes)
        .write(path)
        .map_err(|e| CliError::failure(format!("Error writing report '{}': {}", path.display(), e)))
}
