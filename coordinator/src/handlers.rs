use std::fs;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use common::rpc::routes;
use common::{
    AckResponse, JobInfo, JobResults, MapDoneRequest, ReduceDoneRequest, TaskAssignment,
    TaskAssignmentRequest, TaskUnrunnableRequest, WorkerMetrics,
};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::scheduler::SchedulerError;
use crate::state::{AppState, ViolationPolicy};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(routes::HEALTH, get(health))
        .route(routes::NEXT_TASK, post(assign_task))
        .route(routes::MAP_DONE, post(map_done))
        .route(routes::REDUCE_DONE, post(reduce_done))
        .route(routes::UNRUNNABLE, post(task_unrunnable))
        .route(routes::JOB, get(get_job))
        .route(routes::JOB_RESULTS, get(get_job_results))
        .route(routes::WORKERS, get(list_workers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

type RpcResult = Result<Json<AckResponse>, (StatusCode, String)>;

// Convierte el resultado del scheduler en respuesta; una violación de
// protocolo termina el proceso salvo que se configure lo contrario.
fn ack(state: &AppState, result: Result<(), SchedulerError>) -> RpcResult {
    match result {
        Ok(()) => Ok(Json(AckResponse { ok: true })),
        Err(err) => {
            error!("violación de protocolo: {}", err);
            match state.on_violation {
                ViolationPolicy::Abort => {
                    error!("abortando el coordinador");
                    std::process::exit(2);
                }
                ViolationPolicy::Reject => Err((StatusCode::CONFLICT, err.to_string())),
            }
        }
    }
}

async fn assign_task(
    State(state): State<AppState>,
    Json(req): Json<TaskAssignmentRequest>,
) -> Json<TaskAssignment> {
    let assignment = state.scheduler().assign_task(&req.worker_id);
    Json(assignment)
}

async fn map_done(State(state): State<AppState>, Json(req): Json<MapDoneRequest>) -> RpcResult {
    let result = state
        .scheduler()
        .report_map_done(&req.worker_id, &req.task_name, &req.bucket_files);
    ack(&state, result)
}

async fn reduce_done(
    State(state): State<AppState>,
    Json(req): Json<ReduceDoneRequest>,
) -> RpcResult {
    let result = state.scheduler().report_reduce_done(&req.worker_id, req.index);
    ack(&state, result)
}

async fn task_unrunnable(
    State(state): State<AppState>,
    Json(req): Json<TaskUnrunnableRequest>,
) -> RpcResult {
    let result = state
        .scheduler()
        .report_unrunnable(&req.worker_id, req.phase, &req.name, req.index);
    ack(&state, result)
}

async fn get_job(State(state): State<AppState>) -> Json<JobInfo> {
    let info = state.scheduler().job_info();
    Json(info)
}

// Lista los mr-out-* presentes en el directorio de trabajo
async fn get_job_results(
    State(state): State<AppState>,
) -> Result<Json<JobResults>, StatusCode> {
    let complete = state.scheduler().done();
    let output_dir = state.layout.work_dir.clone();

    let entries = fs::read_dir(&output_dir).map_err(|e| {
        error!("no se pudo listar {}: {}", output_dir.display(), e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let mut files: Vec<String> = entries
        .flatten()
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| state.layout.is_output_name(name))
        .collect();
    files.sort();

    Ok(Json(JobResults {
        output_dir: output_dir.to_string_lossy().to_string(),
        files,
        complete,
    }))
}

async fn list_workers(State(state): State<AppState>) -> Json<Vec<WorkerMetrics>> {
    let metrics = state.scheduler().worker_metrics(Instant::now());
    Json(metrics)
}
