//! Session execution (pytest-style)
//!
//! ## SessionReporter Trait
//!
//! The session loop uses a `SessionReporter` trait to separate reporting from
//! execution. `ConsoleReporter` prints a pytest-like transcript; tests plug in
//! a recording reporter.
//!
//! Entries run one after another. A failed entry is recorded and the loop moves
//! on; nothing stops the session early.

use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::discovery::{RootSample, TestMatrix};
use crate::verify::{ProjectOutcome, ProjectRunner};

// ============================================================================
// Session Reporter Trait
// ============================================================================

/// Trait for reporting session progress.
pub trait SessionReporter {
    /// Called once roots have been walked and sampled
    fn on_roots_sampled(&mut self, _samples: &[RootSample]) {}

    /// Called when the test matrix is final
    fn on_collection_complete(&mut self, project_count: usize);

    /// Called before a project is built
    fn on_project_start(&mut self, _project: &Path) {}

    /// Called when a project has been built and verified
    fn on_project_complete(&mut self, outcome: &ProjectOutcome);

    /// Called when every project has run
    fn on_session_complete(&mut self, summary: &SessionSummary);
}

/// Everything that happened in one session.
#[derive(Debug, Default)]
pub struct SessionSummary {
    pub outcomes: Vec<ProjectOutcome>,
    pub duration: Duration,
}

impl SessionSummary {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    /// Plain summary, e.g. `2 passed, 1 failed in 0.42s`.
    pub fn summary_text(&self) -> String {
        let mut parts = Vec::new();
        if self.passed() > 0 {
            parts.push(format!("{} passed", self.passed()));
        }
        if self.failed() > 0 {
            parts.push(format!("{} failed", self.failed()));
        }
        if parts.is_empty() {
            parts.push("no projects".to_string());
        }
        format!("{} in {:.2}s", parts.join(", "), self.duration.as_secs_f64())
    }
}

/// Run every matrix entry in order and report as it goes.
pub fn run_session<R: Rng + ?Sized>(
    matrix: &TestMatrix,
    runner: &ProjectRunner<'_>,
    rng: &mut R,
    reporter: &mut dyn SessionReporter,
) -> SessionSummary {
    let start_time = Instant::now();
    reporter.on_collection_complete(matrix.len());

    let mut outcomes = Vec::with_capacity(matrix.len());
    for project in matrix.entries() {
        reporter.on_project_start(project);
        let outcome = runner.run(project, rng);
        if !outcome.passed() {
            tracing::warn!(project = %project.display(), "project failed");
        }
        reporter.on_project_complete(&outcome);
        outcomes.push(outcome);
    }

    let summary = SessionSummary {
        outcomes,
        duration: start_time.elapsed(),
    };
    reporter.on_session_complete(&summary);
    summary
}

// ============================================================================
// Console Reporter
// ============================================================================

/// Default console reporter (pytest-style)
///
/// Writes to stdout unless built with [`ConsoleReporter::with_writer`]. Write errors are ignored.
pub struct ConsoleReporter<W: Write = io::Stdout> {
    pub verbose: bool,
    out: W,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self::with_writer(verbose, io::stdout())
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn with_writer(verbose: bool, out: W) -> Self {
        Self { verbose, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SessionReporter for ConsoleReporter<W> {
    fn on_roots_sampled(&mut self, samples: &[RootSample]) {
        if !self.verbose {
            return;
        }
        let _ = writeln!(self.out, "Searched {} root(s):", samples.len());
        for sample in samples {
            let _ = writeln!(
                self.out,
                "  - {} {}: {} found, {} selected",
                sample.root.label(),
                sample.root.path.display(),
                sample.discovered,
                sample.selected.len()
            );
        }
        let _ = writeln!(self.out);
    }

    fn on_collection_complete(&mut self, project_count: usize) {
        if project_count == 0 {
            eprintln!("No example projects selected");
            return;
        }
        let _ = writeln!(
            self.out,
            "\x1b[1m=================== build session starts ===================\x1b[0m"
        );
        let _ = writeln!(self.out, "collected {} project(s)", project_count);
        let _ = writeln!(self.out);
    }

    fn on_project_start(&mut self, project: &Path) {
        if self.verbose {
            // The build can take minutes; show which project is running now.
            let _ = write!(self.out, "{} ... ", project.display());
            let _ = self.out.flush();
        }
    }

    fn on_project_complete(&mut self, outcome: &ProjectOutcome) {
        let status = if outcome.passed() {
            "\x1b[32mPASSED\x1b[0m"
        } else {
            "\x1b[31mFAILED\x1b[0m"
        };
        let env = outcome.environment.as_deref().unwrap_or("-");

        if self.verbose {
            let _ = writeln!(self.out, "[{}] {} ({:.0}ms)", env, status, outcome.duration.as_millis());
        } else {
            let _ = writeln!(self.out, "{} [{}] {}", outcome.project.display(), env, status);
        }
    }

    fn on_session_complete(&mut self, summary: &SessionSummary) {
        let failures: Vec<_> = summary.outcomes.iter().filter(|o| !o.passed()).collect();

        if !failures.is_empty() {
            let _ = writeln!(self.out);
            let _ = writeln!(self.out, "\x1b[1;31m=================== FAILURES ===================\x1b[0m");
            for outcome in failures {
                let _ = writeln!(self.out);
                let _ = writeln!(self.out, "\x1b[1m___________ {} ___________\x1b[0m", outcome.project.display());
                if let Err(failure) = &outcome.result {
                    let _ = writeln!(self.out);
                    for line in failure.to_string().lines() {
                        let _ = writeln!(self.out, "    {}", line);
                    }
                }
            }
        }

        if summary.outcomes.is_empty() {
            return;
        }

        let _ = writeln!(self.out);
        let summary_color = if summary.failed() > 0 { "\x1b[1;31m" } else { "\x1b[1;32m" };
        let _ = writeln!(
            self.out,
            "{}=================== {} ===================\x1b[0m",
            summary_color,
            summary.summary_text()
        );
        let _ = self.out.flush();
    }
}
