pub mod app;
pub mod atomic;
pub mod codec;
pub mod engine;
pub mod indexer;
pub mod job;
pub mod partition;
pub mod results;
pub mod rpc;
pub mod task;
pub mod wordcount;

use serde::{Deserialize, Serialize};

pub use app::{Application, MapFn, ReduceFn};
pub use engine::{FileLayout, MapOutcome, ReduceOutcome};
pub use job::{JobInfo, JobStatus};
pub use results::JobResults;
pub use rpc::{
    AckResponse, MapDoneRequest, ReduceDoneRequest, TaskAssignmentRequest,
    TaskUnrunnableRequest, WorkerMetrics,
};
pub use task::{TaskAssignment, TaskPhase, TaskStatus, WorkerId};

/// Par clave/valor intermedio que produce la función map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
