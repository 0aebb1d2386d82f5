use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use common::engine::{DEFAULT_INTERMEDIATE_PREFIX, DEFAULT_OUTPUT_PREFIX};
use common::{app, FileLayout};
use tracing::info;
use tracing_subscriber::EnvFilter;
use worker::{config, Worker, WorkerConfig};

#[derive(Parser, Debug)]
#[command(name = "worker")]
#[command(about = "Worker MapReduce: pide tareas al coordinador y las ejecuta")]
struct Args {
    /// Aplicación a ejecutar (wc, indexer)
    #[arg(default_value = "wc")]
    app: String,

    /// URL del coordinador; por defecto COORDINATOR_URL o http://127.0.0.1:8030
    #[arg(long)]
    coordinator: Option<String>,

    /// Directorio compartido para intermedios y salidas
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    #[arg(long, default_value_t = 1_000)]
    poll_interval_ms: u64,

    #[arg(long, default_value_t = 5_000)]
    rpc_timeout_ms: u64,

    #[arg(long, default_value = DEFAULT_INTERMEDIATE_PREFIX)]
    intermediate_prefix: String,

    #[arg(long, default_value = DEFAULT_OUTPUT_PREFIX)]
    output_prefix: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("worker=debug,common=info,reqwest=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let application = app::named(&args.app)?;

    // Nombre de host (solo para info)
    let hostname = hostname::get()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let config = WorkerConfig {
        coordinator_url: args.coordinator.unwrap_or_else(config::coordinator_url),
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        rpc_timeout: Duration::from_millis(args.rpc_timeout_ms),
        layout: FileLayout {
            work_dir: args.work_dir,
            intermediate_prefix: args.intermediate_prefix,
            output_prefix: args.output_prefix,
        },
    };

    let worker = Worker::new(config, application)?;
    info!("worker {} arrancando en {}", worker.id(), hostname);

    let summary = worker.run().await?;
    info!(
        "worker {} terminó ({:?}): {} map, {} reduce, {} no ejecutables",
        summary.worker_id, summary.exit, summary.map_tasks, summary.reduce_tasks, summary.unrunnable
    );
    Ok(())
}
