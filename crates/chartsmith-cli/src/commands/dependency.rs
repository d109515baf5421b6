//! Dependency command - `helm dependency build` every chart
//!
//! Runs nested charts first, so an umbrella chart vendoring `charts/sub`
//! finds the sub-chart's own dependencies already fetched.

use chartsmith_core::ChartDir;
use chartsmith_exec::Command;

use crate::error::Result;
use crate::workflow::Workflow;

pub async fn run(workflow: &Workflow, skip_refresh: bool) -> Result<()> {
    workflow
        .for_each_chart("build dependencies of", |wf, chart| {
            Ok(Some(build(wf.helm(), chart, skip_refresh)))
        })
        .await?;
    Ok(())
}

fn build(helm: Command, chart: &ChartDir, skip_refresh: bool) -> Command {
    let cmd = helm
        .arg("dependency")
        .arg("build")
        .arg(chart.path().to_string_lossy());
    if skip_refresh {
        cmd.flag("skip-refresh")
    } else {
        cmd
    }
}
