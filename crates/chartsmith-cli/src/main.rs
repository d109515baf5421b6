//! chartsmith CLI - run helm over every chart in a directory tree

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

mod commands;
mod error;
mod exit_codes;
mod settings;
mod workflow;

use error::Result;
use settings::{Overrides, Resolved, Settings};
use workflow::Workflow;

#[derive(Parser)]
#[command(name = "chartsmith")]
#[command(author = "chartsmith contributors")]
#[command(version)]
#[command(about = "Build, lint, package and push trees of Helm charts", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args)]
struct GlobalArgs {
    /// Root directory searched for charts
    #[arg(long, global = true, env = "CHARTSMITH_CHART_DIR", default_value = ".")]
    chart_dir: PathBuf,

    /// Glob pattern of paths to skip (repeatable)
    #[arg(
        long = "exclude",
        global = true,
        env = "CHARTSMITH_EXCLUDES",
        value_delimiter = ','
    )]
    excludes: Vec<String>,

    /// helm executable [default: helm]
    #[arg(long, global = true, env = "CHARTSMITH_HELM")]
    helm: Option<PathBuf>,

    /// Settings file [default: <config dir>/chartsmith/config.yaml]
    #[arg(long, global = true, env = "CHARTSMITH_CONFIG")]
    config: Option<PathBuf>,

    /// Registry replacing file:// dependency repositories
    #[arg(long, global = true, env = "CHARTSMITH_OVERRIDE_REPOSITORY")]
    override_repository: Option<String>,

    /// Version written for overridden dependencies
    #[arg(long, global = true, env = "CHARTSMITH_OVERRIDE_VERSION")]
    override_version: Option<String>,

    /// Registry username for push and login
    #[arg(long, global = true, env = "CHARTSMITH_REGISTRY_USERNAME")]
    registry_username: Option<String>,

    /// Registry password for push and login
    #[arg(
        long,
        global = true,
        env = "CHARTSMITH_REGISTRY_PASSWORD",
        hide_env_values = true
    )]
    registry_password: Option<String>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run `helm lint` on every chart
    Lint {
        /// Fail on lint warnings
        #[arg(long)]
        strict: bool,

        /// Values file(s) passed to helm
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,
    },

    /// Run `helm dependency build` on every chart
    DependencyBuild {
        /// Do not refresh the local repository cache
        #[arg(long)]
        skip_refresh: bool,
    },

    /// Package every chart into a versioned archive
    #[command(disable_version_flag = true)]
    Package {
        /// Directory receiving the archives
        #[arg(short, long)]
        destination: Option<PathBuf>,

        /// Override the chart version
        #[arg(long)]
        version: Option<String>,

        /// Override the app version
        #[arg(long)]
        app_version: Option<String>,

        /// Update dependencies before packaging
        #[arg(short = 'u', long)]
        dependency_update: bool,
    },

    /// Render every chart locally
    Template {
        /// Values file(s) to merge
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,

        /// Set values on command line (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Target namespace
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Push packaged charts to an OCI registry
    #[command(disable_version_flag = true)]
    Push {
        /// Registry reference (oci://host/path)
        #[arg(long)]
        remote: String,

        /// Directory holding the archives [default: .]
        #[arg(short, long)]
        destination: Option<PathBuf>,

        /// Version used in archive names when packaged with --version
        #[arg(long)]
        version: Option<String>,
    },

    /// Log in to an OCI registry
    Login {
        /// Registry host
        #[arg(long)]
        registry: String,

        /// Allow plain HTTP / self-signed registries
        #[arg(long)]
        insecure: bool,
    },
}

#[tokio::main]
async fn main() {
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(exit_codes::USAGE_ERROR);
        }
        Err(e) => e.exit(),
    };

    init_tracing(cli.global.debug);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let workflow = workflow_from(cli.global)?;

    match cli.command {
        Commands::Lint { strict, values } => commands::lint::run(&workflow, strict, &values).await,

        Commands::DependencyBuild { skip_refresh } => {
            commands::dependency::run(&workflow, skip_refresh).await
        }

        Commands::Package {
            destination,
            version,
            app_version,
            dependency_update,
        } => {
            let options = commands::package::PackageOptions {
                destination: destination.as_deref(),
                version: version.as_deref(),
                app_version: app_version.as_deref(),
                dependency_update,
            };
            commands::package::run(&workflow, &options).await
        }

        Commands::Template {
            values,
            set,
            namespace,
        } => commands::template::run(&workflow, &values, &set, namespace.as_deref()).await,

        Commands::Push {
            remote,
            destination,
            version,
        } => {
            commands::push::run(&workflow, &remote, destination.as_deref(), version.as_deref())
                .await
        }

        Commands::Login { registry, insecure } => {
            commands::login::run(&workflow, &registry, insecure).await
        }
    }
}

fn workflow_from(global: GlobalArgs) -> Result<Workflow> {
    let settings = Settings::load(global.config.as_deref())?;
    let overrides = Overrides {
        chart_dir: global.chart_dir,
        excludes: global.excludes,
        helm: global.helm,
        override_repository: global.override_repository,
        override_version: global.override_version,
        registry_username: global.registry_username,
        registry_password: global.registry_password,
    };

    let resolved = Resolved::merge(settings, overrides)?;
    tracing::debug!(
        chart_dir = %resolved.chart_dir.display(),
        helm = %resolved.helm.display(),
        "configuration resolved"
    );
    Ok(Workflow::new(resolved))
}
