//! Terraform Operator - dependency-ordered Terraform configuration from CRDs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use terraform_operator::config::{OperatorConfig, DEFAULT_CONFIG_DIR};
use terraform_operator::controller::{error_policy, reconcile, Context};
use terraform_operator::crd::{self, EtcdV3, GCS, Google, TerraformResource};
use terraform_operator::preflight::{self, PreflightConfig, DEFAULT_METADATA_URL};
use terraform_operator::render::DEFAULT_EXTENSION;
use terraform_operator::retry::RetryConfig;
use terraform_operator::terraform::{TerraformCommand, TerraformRunner};

/// Terraform Operator - renders Backend, Provider and Module resources into Terraform configuration
#[derive(Parser, Debug)]
#[command(name = "terraform-operator", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    ///
    /// Watches EtcdV3, Google and GCS resources and writes one configuration
    /// document per resource once its dependencies are ready.
    Controller(ControllerArgs),

    /// Run terraform in a namespace's configuration directory
    Terraform(TerraformArgs),
}

/// Controller mode arguments
#[derive(Parser, Debug)]
struct ControllerArgs {
    /// Directory rendered configuration documents are written to
    #[arg(long, env = "TFPATH", default_value = DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// Extension of rendered documents
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    file_extension: String,

    /// Only watch resources in this namespace
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// Seconds between checks while waiting on dependencies
    #[arg(long, default_value = "30")]
    dependency_requeue_secs: u64,

    /// Seconds between resyncs of materialized resources
    #[arg(long, default_value = "300")]
    resync_secs: u64,

    /// Skip the startup metadata endpoint check
    #[arg(long, env = "SKIP_PREFLIGHT")]
    skip_preflight: bool,

    /// Endpoint probed before controllers start
    #[arg(long, default_value = DEFAULT_METADATA_URL)]
    preflight_url: String,

    /// Maximum preflight attempts before giving up
    #[arg(long, default_value = "10")]
    preflight_attempts: u32,
}

impl ControllerArgs {
    fn operator_config(&self) -> OperatorConfig {
        OperatorConfig::new(&self.config_dir)
            .file_extension(self.file_extension.as_str())
            .dependency_requeue(Duration::from_secs(self.dependency_requeue_secs))
            .resync_interval(Duration::from_secs(self.resync_secs))
    }

    fn preflight_config(&self) -> PreflightConfig {
        PreflightConfig {
            retry: RetryConfig::with_max_attempts(self.preflight_attempts),
            ..PreflightConfig::new(self.preflight_url.as_str())
        }
    }
}

/// Terraform mode arguments
#[derive(Parser, Debug)]
struct TerraformArgs {
    /// Directory holding the rendered configuration
    #[arg(long, env = "TFPATH", default_value = DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// Namespace whose documents terraform runs against
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: String,

    /// terraform executable
    #[arg(long, env = "TERRAFORM_BIN", default_value = "terraform")]
    binary: PathBuf,

    /// Steps to run, in order
    #[arg(value_enum, required = true)]
    steps: Vec<TerraformCommand>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if cli.crd {
        let yaml = crd::all_yaml()
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRDs: {}", e))?;
        println!("{yaml}");
        return Ok(());
    }

    match cli.command {
        Some(Commands::Terraform(args)) => run_terraform(args).await,
        Some(Commands::Controller(args)) => run_controller(args).await,
        None => run_controller(ControllerArgs::parse_from(["controller"])).await,
    }
}

/// Run terraform steps against one namespace's documents
async fn run_terraform(args: TerraformArgs) -> anyhow::Result<()> {
    let dir = args.config_dir.join(&args.namespace);
    tracing::info!(dir = %dir.display(), steps = ?args.steps, "Running terraform");
    let runner = TerraformRunner::with_binary(args.binary, dir);
    runner.run_all(&args.steps).await?;
    Ok(())
}

/// Run the controllers for all three resource kinds
async fn run_controller(args: ControllerArgs) -> anyhow::Result<()> {
    if args.skip_preflight {
        tracing::info!("Skipping preflight check");
    } else {
        preflight::run(&args.preflight_config()).await?;
    }

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    let config = args.operator_config();
    tokio::fs::create_dir_all(&config.config_dir)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", config.config_dir.display(), e))?;

    tracing::info!(
        config_dir = %config.config_dir.display(),
        namespace = args.namespace.as_deref().unwrap_or("<all>"),
        "Starting Terraform controllers"
    );

    let ctx = Arc::new(Context::builder(client.clone()).config(config).build());
    let namespace = args.namespace.as_deref();

    tokio::select! {
        _ = run_kind::<EtcdV3>(api(&client, namespace), ctx.clone()) => {
            tracing::info!("EtcdV3 controller completed");
        }
        _ = run_kind::<Google>(api(&client, namespace), ctx.clone()) => {
            tracing::info!("Google controller completed");
        }
        _ = run_kind::<GCS>(api(&client, namespace), ctx.clone()) => {
            tracing::info!("GCS controller completed");
        }
    }

    tracing::info!("Terraform controller shutting down");
    Ok(())
}

fn api<K: TerraformResource>(client: &Client, namespace: Option<&str>) -> Api<K> {
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Drive one resource kind until shutdown
async fn run_kind<K: TerraformResource>(api: Api<K>, ctx: Arc<Context>) {
    Controller::new(api, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile::<K>, error_policy::<K>, ctx)
        .for_each(|result| async move {
            match result {
                Ok((object, action)) => {
                    tracing::debug!(kind = %K::SUB_KIND, object = %object.name, ?action, "Reconciliation completed");
                }
                Err(e) => {
                    tracing::error!(kind = %K::SUB_KIND, error = ?e, "Reconciliation error");
                }
            }
        })
        .await;
}
