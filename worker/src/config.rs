use std::{env, time::Duration};

use common::FileLayout;

pub const DEFAULT_COORDINATOR_URL: &str = "http://127.0.0.1:8030";

/// URL del coordinador.
/// - Si está definida: COORDINATOR_URL
/// - Si no: http://127.0.0.1:8030 (pruebas locales)
pub fn coordinator_url() -> String {
    env::var("COORDINATOR_URL").unwrap_or_else(|_| DEFAULT_COORDINATOR_URL.to_string())
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub coordinator_url: String,
    /// Pausa después de `wait` y después de cada tarea
    pub poll_interval: Duration,
    pub rpc_timeout: Duration,
    pub layout: FileLayout,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            coordinator_url: coordinator_url(),
            poll_interval: Duration::from_secs(1),
            rpc_timeout: Duration::from_secs(5),
            layout: FileLayout::default(),
        }
    }
}
