//! Push command - upload packaged charts with `helm push`
//!
//! Expects the archives `chartsmith package` produced: one
//! `<name>-<version>.tgz` per chart in the destination directory.

use chartsmith_core::{ChartDir, LoadedChart};
use chartsmith_exec::{Command, ResolvedCredentials};
use console::style;
use std::path::Path;

use crate::error::{CliError, Result};
use crate::workflow::Workflow;

pub async fn run(
    workflow: &Workflow,
    remote: &str,
    destination: Option<&Path>,
    version: Option<&str>,
) -> Result<()> {
    if !remote.starts_with("oci://") {
        return Err(CliError::configuration_with_help(
            format!("Invalid remote: {}", remote),
            "helm push expects an OCI reference such as oci://registry.example.com/charts",
        ));
    }

    let destination = destination.unwrap_or(Path::new("."));
    let credentials = workflow.credentials()?;

    workflow
        .for_each_chart("push", |wf, chart| {
            let Some(archive) = archive_for(chart, destination, version)? else {
                println!(
                    "  {} {} has no Chart.yaml, skipped",
                    style("⚠").yellow(),
                    chart
                );
                return Ok(None);
            };

            if !archive.exists() {
                return Err(CliError::Io {
                    message: format!(
                        "Archive not found: {} (run `chartsmith package` first)",
                        archive.display()
                    ),
                });
            }

            Ok(Some(build(
                wf.helm(),
                &archive,
                remote,
                credentials.as_ref(),
            )))
        })
        .await?;

    Ok(())
}

/// Archive path for a chart, `None` when the chart has no descriptor
fn archive_for(
    chart: &ChartDir,
    destination: &Path,
    version: Option<&str>,
) -> Result<Option<std::path::PathBuf>> {
    let Some(loaded) = LoadedChart::load(chart.path())? else {
        return Ok(None);
    };

    let descriptor = &loaded.descriptor;
    let name = match version {
        Some(v) => format!("{}-{}.tgz", descriptor.name, v),
        None => descriptor.archive_name(),
    };

    Ok(Some(destination.join(name)))
}

fn build(
    helm: Command,
    archive: &Path,
    remote: &str,
    credentials: Option<&ResolvedCredentials>,
) -> Command {
    let cmd = helm
        .arg("push")
        .arg(archive.to_string_lossy())
        .arg(remote);

    match credentials {
        Some(creds) => creds.apply(cmd),
        None => cmd,
    }
}
