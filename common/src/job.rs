use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Mapping,
    Reducing,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub status: JobStatus,
    pub n_map: usize,
    pub n_reduce: usize,

    /// -------- Métricas del job --------
    pub map_done: usize,
    pub reduce_done: usize,
    /// Tareas reportadas como no ejecutables (cuentan como done)
    pub map_unrunnable: usize,
    pub reduce_unrunnable: usize,
    /// Buckets reduce sin entradas, cerrados al cruzar la barrera
    pub reduce_skipped: usize,
    /// Veces que una tarea se reasignó por lease vencido
    pub reassignments: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    pub done: bool,
}
