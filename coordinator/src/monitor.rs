use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::state::AppState;

/// Loguea el avance del job cada `every` y avisa de las tareas cuyo lease
/// venció (se reasignan en el próximo pedido de un worker). Termina cuando el
/// job termina.
pub async fn monitor_progress(state: AppState, every: Duration) {
    loop {
        tokio::time::sleep(every).await;
        let now = Instant::now();

        let (info, overdue) = {
            let scheduler = state.scheduler();
            (scheduler.job_info(), scheduler.overdue_tasks(now))
        };

        info!(
            "progreso {:?}: map {}/{}, reduce {}/{}, {} reasignaciones",
            info.status, info.map_done, info.n_map, info.reduce_done, info.n_reduce, info.reassignments
        );

        for (phase, index, owner) in overdue {
            warn!(
                "tarea {} {} de worker {} pasó su lease; se reasigna al próximo pedido",
                phase, index, owner
            );
        }

        if info.done {
            info!("monitor: job terminado");
            break;
        }
    }
}
