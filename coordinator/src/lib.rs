pub mod config;
pub mod handlers;
pub mod monitor;
pub mod scheduler;
pub mod state;

use std::time::Duration;

use anyhow::{Context, Result};
use common::atomic::sweep_stale_temp_files;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use config::CoordinatorConfig;
pub use scheduler::{Scheduler, SchedulerError};
pub use state::{AppState, ViolationPolicy};

/// Levanta el coordinador y bloquea hasta que el job termina (o Ctrl-C).
pub async fn run(config: CoordinatorConfig) -> Result<()> {
    let scheduler = Scheduler::new(config.inputs.clone(), config.n_reduce, config.task_timeout)?;
    let state = AppState::new(scheduler, config.layout.clone());

    // temporales de una corrida anterior que murió antes del rename
    match sweep_stale_temp_files(&config.layout.work_dir, Duration::ZERO) {
        Ok(0) => {}
        Ok(n) => info!("{} temporales huérfanos borrados de {}", n, config.layout.work_dir.display()),
        Err(e) => warn!("no se pudo barrer {}: {}", config.layout.work_dir.display(), e),
    }

    let listener = TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("no se pudo escuchar en {}", config.addr))?;
    info!("coordinador escuchando en {}", listener.local_addr()?);

    // monitor de progreso en segundo plano
    let monitor_state = state.clone();
    let monitor_every = config.monitor_interval;
    tokio::spawn(async move {
        monitor::monitor_progress(monitor_state, monitor_every).await;
    });

    let app = handlers::build_router(state.clone());
    let shutdown = shutdown_signal(state.clone(), config.done_poll_interval, config.linger);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("error en el servidor RPC")?;

    let info = state.scheduler().job_info();
    info!(
        "coordinador cerrado: done={} map {}/{} reduce {}/{}",
        info.done, info.map_done, info.n_map, info.reduce_done, info.n_reduce
    );
    Ok(())
}

/// Espera (consultando cada `poll`) a que el job termine.
pub async fn wait_until_done(state: &AppState, poll: Duration) {
    loop {
        let done = state.scheduler().done();
        if done {
            return;
        }
        tokio::time::sleep(poll).await;
    }
}

async fn shutdown_signal(state: AppState, poll: Duration, linger: Duration) {
    let interrupted = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = wait_until_done(&state, poll) => {
            info!("job terminado; el servidor sigue {:?} para que los workers reciban exit", linger);
            tokio::time::sleep(linger).await;
        }
        _ = interrupted => {
            warn!("interrumpido antes de terminar el job");
        }
    }
}
