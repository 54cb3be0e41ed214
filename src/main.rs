//! machine-scaler - scale Cluster API Machine resources to a desired count

use clap::{Parser, Subcommand};

use machine_scaler::config::{ClusterArgs, PolicyArgs, ScalerConfig};
use machine_scaler::crd::crd_manifest;
use machine_scaler::reconciler_from_env;
use machine_scaler::telemetry::{init_logging, LogFormat};

/// machine-scaler - one-shot scaling of Cluster API Machine resources
#[derive(Parser, Debug)]
#[command(name = "machine-scaler", version, about, long_about = None)]
struct Cli {
    /// Log output format
    #[arg(long, env = "MACHINE_SCALER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scale worker machines to the desired count
    ///
    /// Reads the kubeconfig from KUBECONFIG_CONTENT, lists the machines and
    /// clones or deletes one machine at a time until the worker count
    /// matches. The first API error aborts the run.
    Scale(ScaleArgs),

    /// Print the current machine and worker counts
    Status(StatusArgs),

    /// Print the Machine CRD manifest and exit
    Crd,
}

#[derive(Parser, Debug)]
struct ScaleArgs {
    /// Desired number of worker machines
    #[arg(short, long, env = "MACHINE_SCALER_REPLICAS")]
    replicas: usize,

    #[command(flatten)]
    cluster: ClusterArgs,

    #[command(flatten)]
    policy: PolicyArgs,
}

#[derive(Parser, Debug)]
struct StatusArgs {
    #[command(flatten)]
    cluster: ClusterArgs,

    #[command(flatten)]
    policy: PolicyArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: Failed to install crypto provider: {:?}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();
    init_logging(cli.log_format)?;

    match cli.command {
        Commands::Scale(args) => run_scale(args).await,
        Commands::Status(args) => run_status(args).await,
        Commands::Crd => {
            println!("{}", crd_manifest()?);
            Ok(())
        }
    }
}

async fn run_scale(args: ScaleArgs) -> anyhow::Result<()> {
    let config = ScalerConfig::from_args(&args.cluster, &args.policy)?;
    let reconciler = reconciler_from_env(&config).await?;

    let outcome = reconciler.reconcile(args.replicas).await?;

    if outcome.is_noop() {
        println!("Workers already at {}", outcome.current);
    } else {
        println!(
            "Workers scaled from {} to {} (created {}, deleted {})",
            outcome.previous,
            outcome.current,
            outcome.created.len(),
            outcome.deleted.len()
        );
    }
    if !outcome.converged() {
        println!(
            "Stopped at {} workers: at least {} worker(s) are always kept",
            outcome.current,
            reconciler.policy().min_workers
        );
    }
    Ok(())
}

async fn run_status(args: StatusArgs) -> anyhow::Result<()> {
    let config = ScalerConfig::from_args(&args.cluster, &args.policy)?;
    let reconciler = reconciler_from_env(&config).await?;

    let workers = reconciler.worker_count().await?;
    println!(
        "Namespace: {}\nReserved machines: {}\nWorker machines: {}",
        config.namespace,
        reconciler.policy().reserved,
        workers
    );
    Ok(())
}
