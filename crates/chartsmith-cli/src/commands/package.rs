//! Package command - create chart archives with `helm package`

use chartsmith_core::ChartDir;
use chartsmith_exec::Command;
use console::style;
use std::path::Path;

use crate::error::Result;
use crate::workflow::Workflow;

/// Options forwarded to `helm package`
#[derive(Debug, Clone, Default)]
pub struct PackageOptions<'a> {
    pub destination: Option<&'a Path>,
    pub version: Option<&'a str>,
    pub app_version: Option<&'a str>,
    pub dependency_update: bool,
}

pub async fn run(workflow: &Workflow, options: &PackageOptions<'_>) -> Result<()> {
    if let Some(destination) = options.destination {
        std::fs::create_dir_all(destination)?;
    }

    let count = workflow
        .for_each_chart("package", |wf, chart| Ok(Some(build(wf.helm(), chart, options))))
        .await?;

    if count > 0 {
        let destination = options.destination.unwrap_or(Path::new("."));
        println!(
            "  {} {}",
            style("Archives in").dim(),
            destination.display()
        );
    }

    Ok(())
}

fn build(helm: Command, chart: &ChartDir, options: &PackageOptions<'_>) -> Command {
    let cmd = helm
        .arg("package")
        .arg(chart.path().to_string_lossy())
        .flag_opt("destination", options.destination.map(|d| d.to_string_lossy()))
        .flag_opt("version", options.version)
        .flag_opt("app-version", options.app_version);

    if options.dependency_update {
        cmd.flag("dependency-update")
    } else {
        cmd
    }
}
