//! Lint command - `helm lint` every chart

use chartsmith_core::ChartDir;
use chartsmith_exec::Command;
use std::path::PathBuf;

use crate::error::Result;
use crate::workflow::Workflow;

pub async fn run(workflow: &Workflow, strict: bool, values: &[PathBuf]) -> Result<()> {
    workflow
        .for_each_chart("lint", |wf, chart| Ok(Some(build(wf.helm(), chart, strict, values))))
        .await?;
    Ok(())
}

fn build(helm: Command, chart: &ChartDir, strict: bool, values: &[PathBuf]) -> Command {
    let mut cmd = helm.arg("lint").arg(chart.path().to_string_lossy());
    if strict {
        cmd = cmd.flag("strict");
    }
    for file in values {
        cmd = cmd.flag_value("values", file.to_string_lossy());
    }
    cmd
}
