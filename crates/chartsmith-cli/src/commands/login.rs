//! Login command - `helm registry login` with the password on stdin

use chartsmith_exec::{Command, ResolvedCredentials};
use console::style;

use crate::error::{CliError, Result};
use crate::workflow::Workflow;

pub async fn run(workflow: &Workflow, registry: &str, insecure: bool) -> Result<()> {
    let Some(credentials) = workflow.credentials()? else {
        return Err(CliError::configuration_with_help(
            format!("No credentials configured for {}", registry),
            "pass --registry-username/--registry-password or add registry.credentials to the config file",
        ));
    };

    let cmd = build(workflow.helm(), registry, insecure, &credentials);

    println!("{} Logging in to {}", style("→").blue(), registry);
    workflow
        .run(&cmd, &format!("Failed to log in to {}", registry))
        .await?;
    println!("{} Logged in", style("✓").green().bold());

    Ok(())
}

fn build(helm: Command, registry: &str, insecure: bool, credentials: &ResolvedCredentials) -> Command {
    let cmd = helm.arg("registry").arg("login").arg(registry);
    let cmd = if insecure { cmd.flag("insecure") } else { cmd };
    credentials.apply_stdin(cmd)
}
