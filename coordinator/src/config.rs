use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use common::engine::DEFAULT_OUTPUT_PREFIX;
use common::FileLayout;
use glob::glob;
use tracing::warn;

use crate::scheduler::DEFAULT_TASK_TIMEOUT;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8030";

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub addr: String,
    /// Un archivo por tarea map, en este orden
    pub inputs: Vec<String>,
    pub n_reduce: usize,
    pub task_timeout: Duration,
    pub monitor_interval: Duration,
    /// Cada cuánto se consulta si el job terminó
    pub done_poll_interval: Duration,
    /// Tiempo que el servidor sigue vivo después de terminar, para que los
    /// workers reciban `exit`
    pub linger: Duration,
    pub layout: FileLayout,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            inputs: Vec::new(),
            n_reduce: 10,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            monitor_interval: Duration::from_secs(5),
            done_poll_interval: Duration::from_secs(1),
            linger: Duration::from_secs(2),
            layout: FileLayout::default(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "coordinator")]
#[command(about = "Coordinador MapReduce: reparte tareas map/reduce a los workers")]
pub struct Args {
    /// Archivos de entrada; se aceptan patrones glob, ej: "data/pg-*.txt"
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// Cantidad de buckets reduce
    #[arg(short = 'r', long, default_value_t = 10)]
    pub n_reduce: usize,

    /// Dirección donde escucha el RPC
    #[arg(long, env = "COORDINATOR_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Lease de cada tarea en milisegundos
    #[arg(long, default_value_t = 10_000)]
    pub task_timeout_ms: u64,

    #[arg(long, default_value_t = 5_000)]
    pub monitor_interval_ms: u64,

    #[arg(long, default_value_t = 2_000)]
    pub linger_ms: u64,

    /// Directorio compartido donde quedan los mr-out-*
    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_OUTPUT_PREFIX)]
    pub output_prefix: String,
}

impl Args {
    pub fn into_config(self) -> Result<CoordinatorConfig> {
        let inputs = expand_inputs(&self.inputs)?;
        let defaults = CoordinatorConfig::default();
        Ok(CoordinatorConfig {
            addr: self.addr,
            inputs,
            n_reduce: self.n_reduce,
            task_timeout: Duration::from_millis(self.task_timeout_ms),
            monitor_interval: Duration::from_millis(self.monitor_interval_ms),
            linger: Duration::from_millis(self.linger_ms),
            layout: FileLayout {
                work_dir: self.work_dir,
                output_prefix: self.output_prefix,
                ..FileLayout::default()
            },
            ..defaults
        })
    }
}

fn is_pattern(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Expande los patrones glob. Una ruta literal se conserva aunque no exista:
/// el worker que la reciba la reportará como no ejecutable. Los repetidos se
/// descartan conservando el primero.
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |path: String| {
        if out.contains(&path) {
            warn!("entrada repetida {}, se ignora", path);
        } else {
            out.push(path);
        }
    };

    for pattern in patterns {
        if !is_pattern(pattern) {
            push(pattern.clone());
            continue;
        }

        let mut matched = 0;
        for entry in glob(pattern).with_context(|| format!("patrón inválido: {}", pattern))? {
            let path = entry?;
            if path.is_file() {
                push(path.to_string_lossy().to_string());
                matched += 1;
            }
        }
        if matched == 0 {
            warn!("el patrón {} no coincide con ningún archivo", pattern);
        }
    }
    Ok(out)
}
