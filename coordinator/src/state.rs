use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use common::FileLayout;

use crate::scheduler::Scheduler;

/// Qué hacer ante una violación de protocolo en un RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationPolicy {
    /// Termina el proceso (indica un bug en algún worker)
    Abort,
    /// Responde 409 y sigue (útil en pruebas)
    Reject,
}

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Mutex<Scheduler>>,
    // dónde buscar los archivos de salida para /api/v1/job/results
    pub layout: Arc<FileLayout>,
    pub on_violation: ViolationPolicy,
}

impl AppState {
    pub fn new(scheduler: Scheduler, layout: FileLayout) -> Self {
        Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            layout: Arc::new(layout),
            on_violation: ViolationPolicy::Abort,
        }
    }

    pub fn with_violation_policy(mut self, policy: ViolationPolicy) -> Self {
        self.on_violation = policy;
        self
    }

    /// Toma el lock del scheduler. Las secciones críticas son cortas y no
    /// hacen I/O, así que no se sostiene nunca a través de un `.await`.
    pub fn scheduler(&self) -> MutexGuard<'_, Scheduler> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
