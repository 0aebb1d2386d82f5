use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use common::rpc::routes;
use common::{JobInfo, JobResults, WorkerMetrics};
use reqwest::Client;
use serde::de::DeserializeOwned;

#[derive(Parser)]
#[command(name = "mrctl")]
#[command(about = "CLI simple para consultar al coordinador MapReduce")]
struct Cli {
    /// URL del coordinador
    #[arg(
        long,
        global = true,
        env = "COORDINATOR_URL",
        default_value = "http://127.0.0.1:8030"
    )]
    coordinator: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estado y métricas del job
    Status,
    /// Espera hasta que el job termine
    Wait {
        #[arg(long, default_value_t = 1_000)]
        interval_ms: u64,
    },
    /// Lista los archivos de salida
    Results,
    /// Lista los workers vistos por el coordinador
    Workers,
}

async fn get_json<T: DeserializeOwned>(client: &Client, base_url: &str, route: &str) -> Result<T> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), route);
    let resp = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("no se pudo consultar {}", url))?;
    if !resp.status().is_success() {
        bail!("error consultando {} (status {})", route, resp.status());
    }
    Ok(resp.json().await?)
}

/// Porcentaje de tareas terminadas (map + reduce), None si no hay tareas.
fn progress_pct(job: &JobInfo) -> Option<f64> {
    let total = job.n_map + job.n_reduce;
    if total == 0 {
        return None;
    }
    let done = job.map_done + job.reduce_done;
    Some(done as f64 / total as f64 * 100.0)
}

fn print_job(job: &JobInfo) {
    println!("Job:");
    println!("  estado: {:?}", job.status);
    println!(
        "  map   : {}/{} (no ejecutables: {})",
        job.map_done, job.n_map, job.map_unrunnable
    );
    println!(
        "  reduce: {}/{} (no ejecutables: {}, omitidos: {})",
        job.reduce_done, job.n_reduce, job.reduce_unrunnable, job.reduce_skipped
    );
    println!("  reasignaciones: {}", job.reassignments);
    match progress_pct(job) {
        Some(pct) => println!("  progreso: {:.1}%", pct),
        None => println!("  progreso: (sin tareas)"),
    }
    println!("  iniciado: {}", job.started_at);
    if let Some(ref done) = job.finished_at {
        println!("  finalizado: {}", done);
    }
}

fn print_worker(w: &WorkerMetrics) {
    println!("Worker {}", w.worker_id);
    println!("  vivo          : {}", w.alive);
    println!("  primer contacto: hace {} s", w.first_contact_secs_ago);
    println!("  último contacto: hace {} s", w.last_contact_secs_ago);
    println!(
        "  tareas        : asignadas={}, ok={}, no ejecutables={}",
        w.tasks_assigned, w.tasks_completed, w.tasks_unrunnable
    );
    match &w.current_task {
        Some(t) => println!("  tarea actual  : {}", t),
        None => println!("  tarea actual  : (ninguna)"),
    }
    println!();
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = cli.coordinator;

    match cli.command {
        Commands::Status => {
            let job: JobInfo = get_json(&client, &base_url, routes::JOB).await?;
            print_job(&job);
        }

        Commands::Wait { interval_ms } => loop {
            let job: JobInfo = get_json(&client, &base_url, routes::JOB).await?;
            if job.done {
                println!("Job terminado.");
                print_job(&job);
                break;
            }
            if let Some(pct) = progress_pct(&job) {
                println!("{:?} {:.1}%", job.status, pct);
            }
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        },

        Commands::Results => {
            let results: JobResults = get_json(&client, &base_url, routes::JOB_RESULTS).await?;
            println!("Resultados:");
            println!("  directorio de salida: {}", results.output_dir);
            if !results.complete {
                println!("  (el job sigue corriendo, la lista puede estar incompleta)");
            }
            if results.files.is_empty() {
                println!("  (sin archivos de salida)");
            } else {
                println!("  archivos:");
                for f in results.files {
                    println!("    - {}", f);
                }
            }
        }

        Commands::Workers => {
            let workers: Vec<WorkerMetrics> = get_json(&client, &base_url, routes::WORKERS).await?;
            if workers.is_empty() {
                println!("El coordinador todavía no vio ningún worker.");
            }
            for w in &workers {
                print_worker(w);
            }
        }
    }

    Ok(())
}
