//! Per-chart operation driver
//!
//! Scans the chart tree, applies the dependency override to each chart when
//! enabled, then runs one helm command per chart. Charts are processed one at
//! a time in scan order (nested charts first); the first failure stops the run.

use chartsmith_core::{rewrite, scan, ChartDir, DependencyOverride, RewriteOutcome};
use chartsmith_exec::{Command, CommandRunner, Credentials, ResolvedCredentials};
use console::style;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;
use crate::settings::Resolved;

pub struct Workflow {
    chart_dir: PathBuf,
    excludes: Vec<String>,
    helm: PathBuf,
    dependency_override: Option<DependencyOverride>,
    credentials: Option<Credentials>,
    runner: CommandRunner,
}

impl Workflow {
    pub fn new(config: Resolved) -> Self {
        Self::with_runner(config, CommandRunner::new())
    }

    pub fn with_runner(config: Resolved, runner: CommandRunner) -> Self {
        Self {
            chart_dir: config.chart_dir,
            excludes: config.excludes,
            helm: config.helm,
            dependency_override: config.dependency_override,
            credentials: config.credentials,
            runner,
        }
    }

    /// A fresh helm command
    pub fn helm(&self) -> Command {
        Command::new(&self.helm)
    }

    /// Registry credentials, resolved now so env references are read per run
    pub fn credentials(&self) -> Result<Option<ResolvedCredentials>> {
        Ok(self.credentials.as_ref().map(Credentials::resolve).transpose()?)
    }

    /// Chart directories in processing order; empty trees only warn
    pub fn charts(&self) -> Result<Vec<ChartDir>> {
        let charts = scan(&self.chart_dir, &self.excludes)?;
        if charts.is_empty() {
            warn!(dir = %self.chart_dir.display(), "no charts found");
            println!(
                "{} No charts found in {}",
                style("⚠").yellow(),
                self.chart_dir.display()
            );
        }
        Ok(charts)
    }

    /// Run `build` for every chart, stopping at the first failure
    ///
    /// `action` is used in progress output and in failure messages, e.g.
    /// "lint" gives "Failed to lint chart <dir>".
    pub async fn for_each_chart<F>(&self, action: &str, mut build: F) -> Result<usize>
    where
        F: FnMut(&Workflow, &ChartDir) -> Result<Option<Command>>,
    {
        let charts = self.charts()?;

        for chart in &charts {
            self.apply_override(chart.path())?;

            let Some(cmd) = build(self, chart)? else {
                continue;
            };

            println!("{} {} {}", style("→").blue(), capitalize(action), chart);
            self.run(&cmd, &format!("Failed to {} chart {}", action, chart))
                .await?;
        }

        if !charts.is_empty() {
            println!(
                "{} {} chart(s) processed",
                style("✓").green().bold(),
                charts.len()
            );
        }

        Ok(charts.len())
    }

    /// Execute a single helm command
    pub async fn run(&self, cmd: &Command, on_failure: &str) -> Result<()> {
        self.runner.execute(cmd, on_failure).await?;
        Ok(())
    }

    fn apply_override(&self, dir: &Path) -> Result<()> {
        let Some(ov) = &self.dependency_override else {
            return Ok(());
        };

        match rewrite(dir, ov)? {
            RewriteOutcome::Rewritten {
                candidates,
                lock_removed,
            } => {
                println!(
                    "  {} {} local dependenc{} now point at {}{}",
                    style("✎").cyan(),
                    candidates,
                    if candidates == 1 { "y" } else { "ies" },
                    ov.repository,
                    if lock_removed { " (Chart.lock removed)" } else { "" }
                );
            }
            RewriteOutcome::NoDescriptor => {
                println!(
                    "  {} {} has no Chart.yaml, skipped override",
                    style("⚠").yellow(),
                    dir.display()
                );
            }
            outcome => debug!(dir = %dir.display(), ?outcome, "override not needed"),
        }

        Ok(())
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
