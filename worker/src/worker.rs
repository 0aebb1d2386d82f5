use anyhow::{Context, Result};
use common::engine::{execute_map, execute_reduce};
use common::{Application, MapOutcome, ReduceOutcome, TaskAssignment, TaskPhase, WorkerId};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::CoordinatorClient;
use crate::config::WorkerConfig;

/// Por qué terminó el loop del worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// El coordinador respondió `exit`
    JobFinished,
    /// No se pudo hablar con el coordinador; se asume que el job terminó
    CoordinatorGone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSummary {
    pub worker_id: WorkerId,
    pub map_tasks: u32,
    pub reduce_tasks: u32,
    pub unrunnable: u32,
    pub exit: ExitReason,
}

/// Lo que hay que contarle al coordinador después de ejecutar una tarea.
#[derive(Debug)]
enum Report {
    MapDone {
        task_name: String,
        bucket_files: Vec<String>,
    },
    ReduceDone {
        index: usize,
    },
    Unrunnable {
        phase: TaskPhase,
        name: String,
        index: usize,
    },
}

pub struct Worker {
    id: WorkerId,
    app: Application,
    client: CoordinatorClient,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(config: WorkerConfig, app: Application) -> Result<Self> {
        let client = CoordinatorClient::new(config.coordinator_url.clone(), config.rpc_timeout)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            app,
            client,
            config,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Loop principal del worker.
    /// - Pide una tarea al coordinador.
    /// - Ejecuta map/reduce en el pool bloqueante y reporta el resultado.
    /// - Duerme `poll_interval` y repite hasta recibir `exit` o perder al
    ///   coordinador.
    ///
    /// Solo devuelve error si la función map/reduce entra en pánico.
    pub async fn run(self) -> Result<WorkerSummary> {
        info!(
            "worker {} ({}) contra {}",
            self.id,
            self.app.name,
            self.client.base_url()
        );

        let mut summary = WorkerSummary {
            worker_id: self.id.clone(),
            map_tasks: 0,
            reduce_tasks: 0,
            unrunnable: 0,
            exit: ExitReason::CoordinatorGone,
        };

        loop {
            let assignment = match self.client.request_task(&self.id).await {
                Ok(a) => a,
                Err(e) => {
                    warn!("no se pudo contactar al coordinador ({:#}); se asume job terminado", e);
                    break;
                }
            };

            let report = match assignment {
                TaskAssignment::Map {
                    source,
                    index,
                    n_reduce,
                } => {
                    summary.map_tasks += 1;
                    Some(self.run_map(source, index, n_reduce).await?)
                }
                TaskAssignment::Reduce { inputs, index, .. } => {
                    summary.reduce_tasks += 1;
                    self.run_reduce(inputs, index).await?
                }
                TaskAssignment::Wait => {
                    debug!("no hay tareas, esperando {:?}...", self.config.poll_interval);
                    None
                }
                TaskAssignment::Exit => {
                    info!("el coordinador indicó exit; worker {} termina", self.id);
                    summary.exit = ExitReason::JobFinished;
                    break;
                }
            };

            if let Some(report) = report {
                if matches!(report, Report::Unrunnable { .. }) {
                    summary.unrunnable += 1;
                }
                if let Err(e) = self.send_report(report).await {
                    warn!("no se pudo reportar al coordinador ({:#}); se asume job terminado", e);
                    break;
                }
            }

            sleep(self.config.poll_interval).await;
        }

        Ok(summary)
    }

    async fn run_map(&self, source: String, index: usize, n_reduce: usize) -> Result<Report> {
        info!("tengo map {} ({})", index, source);
        let map_fn = self.app.map_fn;
        let layout = self.config.layout.clone();
        let src = source.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            execute_map(map_fn, &src, index, n_reduce, &layout)
        })
        .await
        .context("la tarea map terminó con pánico")?;

        Ok(match outcome {
            MapOutcome::Completed { bucket_files } => Report::MapDone {
                task_name: source,
                bucket_files,
            },
            MapOutcome::Unrunnable { reason } => {
                warn!("map {} no ejecutable: {}", index, reason);
                Report::Unrunnable {
                    phase: TaskPhase::Map,
                    name: source,
                    index,
                }
            }
        })
    }

    /// Devuelve `None` si falta algún intermedio: no se reporta nada y el
    /// coordinador reasigna la tarea cuando vence el lease.
    async fn run_reduce(&self, inputs: Vec<String>, index: usize) -> Result<Option<Report>> {
        info!("tengo reduce {} ({} intermedios)", index, inputs.len());
        let reduce_fn = self.app.reduce_fn;
        let layout = self.config.layout.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            execute_reduce(reduce_fn, &inputs, index, &layout)
        })
        .await
        .context("la tarea reduce terminó con pánico")?;

        Ok(match outcome {
            ReduceOutcome::Completed { .. } => Some(Report::ReduceDone { index }),
            ReduceOutcome::InputUnavailable { reason } => {
                warn!("reduce {} sin salida: {}; queda para otro intento", index, reason);
                None
            }
            ReduceOutcome::Unrunnable { reason } => {
                warn!("reduce {} no ejecutable: {}", index, reason);
                Some(Report::Unrunnable {
                    phase: TaskPhase::Reduce,
                    name: self.config.layout.output_name(index),
                    index,
                })
            }
        })
    }

    async fn send_report(&self, report: Report) -> Result<()> {
        match report {
            Report::MapDone {
                task_name,
                bucket_files,
            } => {
                self.client
                    .report_map_done(&self.id, &task_name, bucket_files)
                    .await
            }
            Report::ReduceDone { index } => self.client.report_reduce_done(&self.id, index).await,
            Report::Unrunnable { phase, name, index } => {
                self.client
                    .report_unrunnable(&self.id, phase, &name, index)
                    .await
            }
        }
    }
}
