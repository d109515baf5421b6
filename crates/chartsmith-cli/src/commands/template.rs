//! Template command - render every chart with `helm template`

use chartsmith_core::ChartDir;
use chartsmith_exec::Command;
use std::path::PathBuf;

use crate::error::Result;
use crate::workflow::Workflow;

pub async fn run(
    workflow: &Workflow,
    values: &[PathBuf],
    set: &[String],
    namespace: Option<&str>,
) -> Result<()> {
    workflow
        .for_each_chart("render", |wf, chart| {
            Ok(Some(build(wf.helm(), chart, values, set, namespace)))
        })
        .await?;
    Ok(())
}

fn build(
    helm: Command,
    chart: &ChartDir,
    values: &[PathBuf],
    set: &[String],
    namespace: Option<&str>,
) -> Command {
    let mut cmd = helm.arg("template").arg(chart.path().to_string_lossy());
    for file in values {
        cmd = cmd.flag_value("values", file.to_string_lossy());
    }
    for pair in set {
        cmd = cmd.flag_value("set", pair.as_str());
    }
    cmd.flag_opt("namespace", namespace)
}
