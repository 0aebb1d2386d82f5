use std::time::Duration;

use anyhow::{bail, Context, Result};
use common::rpc::routes;
use common::{
    AckResponse, MapDoneRequest, ReduceDoneRequest, TaskAssignment, TaskAssignmentRequest,
    TaskPhase, TaskUnrunnableRequest,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

/// Cliente RPC del coordinador. Cualquier error (conexión, timeout, status no
/// exitoso o cuerpo inválido) es una falla de transporte.
#[derive(Clone)]
pub struct CoordinatorClient {
    http: Client,
    base_url: String,
}

impl CoordinatorClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("no se pudo crear el cliente HTTP")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(&self, route: &str, body: &Req) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, route);
        let res = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {}", url))?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    async fn post_ack<Req: Serialize>(&self, route: &str, body: &Req) -> Result<()> {
        let ack: AckResponse = self.post(route, body).await?;
        if !ack.ok {
            bail!("el coordinador rechazó el reporte en {}", route);
        }
        Ok(())
    }

    pub async fn request_task(&self, worker_id: &str) -> Result<TaskAssignment> {
        self.post(
            routes::NEXT_TASK,
            &TaskAssignmentRequest {
                worker_id: worker_id.to_string(),
            },
        )
        .await
    }

    pub async fn report_map_done(
        &self,
        worker_id: &str,
        task_name: &str,
        bucket_files: Vec<String>,
    ) -> Result<()> {
        self.post_ack(
            routes::MAP_DONE,
            &MapDoneRequest {
                worker_id: worker_id.to_string(),
                task_name: task_name.to_string(),
                bucket_files,
            },
        )
        .await
    }

    pub async fn report_reduce_done(&self, worker_id: &str, index: usize) -> Result<()> {
        self.post_ack(
            routes::REDUCE_DONE,
            &ReduceDoneRequest {
                worker_id: worker_id.to_string(),
                index,
            },
        )
        .await
    }

    pub async fn report_unrunnable(
        &self,
        worker_id: &str,
        phase: TaskPhase,
        name: &str,
        index: usize,
    ) -> Result<()> {
        self.post_ack(
            routes::UNRUNNABLE,
            &TaskUnrunnableRequest {
                worker_id: worker_id.to_string(),
                phase,
                name: name.to_string(),
                index,
            },
        )
        .await
    }
}
