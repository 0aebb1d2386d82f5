use std::fmt;

use serde::{Deserialize, Serialize};

pub type WorkerId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    Map,
    Reduce,
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPhase::Map => write!(f, "map"),
            TaskPhase::Reduce => write!(f, "reduce"),
        }
    }
}

/// Estado de una tarea. Solo avanza: Unassigned -> InProgress -> Done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Unassigned,
    InProgress,
    Done,
}

/// Respuesta del coordinador a `RequestTask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskAssignment {
    Map {
        /// Ruta del archivo de entrada (también es el nombre de la tarea)
        source: String,
        index: usize,
        n_reduce: usize,
    },
    Reduce {
        /// Archivos intermedios registrados para este bucket
        inputs: Vec<String>,
        index: usize,
        n_reduce: usize,
    },
    Wait,
    Exit,
}
