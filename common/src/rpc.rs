use serde::{Deserialize, Serialize};

use crate::task::{TaskPhase, WorkerId};

/// Rutas HTTP del coordinador, compartidas por servidor, worker y CLI.
pub mod routes {
    pub const HEALTH: &str = "/health";
    pub const NEXT_TASK: &str = "/api/v1/tasks/next";
    pub const MAP_DONE: &str = "/api/v1/tasks/map/done";
    pub const REDUCE_DONE: &str = "/api/v1/tasks/reduce/done";
    pub const UNRUNNABLE: &str = "/api/v1/tasks/unrunnable";
    pub const JOB: &str = "/api/v1/job";
    pub const JOB_RESULTS: &str = "/api/v1/job/results";
    pub const WORKERS: &str = "/api/v1/workers";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignmentRequest {
    pub worker_id: WorkerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDoneRequest {
    pub worker_id: WorkerId,
    /// Nombre de la tarea map (la ruta del archivo de entrada)
    pub task_name: String,
    /// Un elemento por bucket; "" si el bucket quedó vacío
    pub bucket_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReduceDoneRequest {
    pub worker_id: WorkerId,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskUnrunnableRequest {
    pub worker_id: WorkerId,
    pub phase: TaskPhase,
    pub name: String,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WorkerMetrics {
    pub worker_id: WorkerId,
    pub alive: bool,
    pub first_contact_secs_ago: u64,
    pub last_contact_secs_ago: u64,
    pub tasks_assigned: u64,
    pub tasks_completed: u64,
    pub tasks_unrunnable: u64,
    /// Tarea que tiene asignada ahora mismo, ej: "map 3"
    pub current_task: Option<String>,
}
