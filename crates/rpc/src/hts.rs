//! HumanTaskSystem client.
//!
//! ```text
//! PUT  /api/v2/hts                               -> create   (200 + HumanTask)
//! GET  /api/v2/hts/{processId}/{taskId}          -> get_task (200 + HumanTask)
//! PUT  /api/v2/hts/{processId}/{taskId}/status/S -> update   (204)
//! ```

use async_trait::async_trait;
use reqwest::{Method, StatusCode};

use satellite_core::error::RemoteCallError;
use satellite_core::process::Status;
use satellite_core::remote::{HumanTask, HumanTaskSystem, NewHumanTask};

use crate::endpoint::CoreEndpoint;
use crate::error::{expect_status, parse_response, RpcError};

pub struct RpcHumanTaskSystem {
    client: reqwest::Client,
    endpoint: CoreEndpoint,
}

impl RpcHumanTaskSystem {
    pub fn new(endpoint: CoreEndpoint) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: CoreEndpoint) -> Self {
        Self { client, endpoint }
    }

    async fn put_task(&self, task: &HumanTask) -> Result<HumanTask, RpcError> {
        let response = self
            .endpoint
            .request(&self.client, Method::PUT, "/hts")
            .json(task)
            .send()
            .await?;
        parse_response(response, StatusCode::OK).await
    }

    async fn fetch(&self, process_id: &str, task_id: &str) -> Result<HumanTask, RpcError> {
        let response = self
            .endpoint
            .request(
                &self.client,
                Method::GET,
                &format!("/hts/{process_id}/{task_id}"),
            )
            .send()
            .await?;
        parse_response(response, StatusCode::OK).await
    }

    async fn put_status(
        &self,
        process_id: &str,
        task_id: &str,
        status: Status,
        comment: Option<&str>,
    ) -> Result<(), RpcError> {
        let mut request = self.endpoint.request(
            &self.client,
            Method::PUT,
            &format!("/hts/{process_id}/{task_id}/status/{status}"),
        );
        if let Some(comment) = comment {
            request = request.body(comment.to_string());
        }
        expect_status(request.send().await?, StatusCode::NO_CONTENT).await?;
        Ok(())
    }
}

#[async_trait]
impl HumanTaskSystem for RpcHumanTaskSystem {
    async fn create(&self, task: NewHumanTask) -> Result<HumanTask, RemoteCallError> {
        let task = HumanTask::from(task);
        tracing::info!(
            process = %task.process_id,
            task = %task.task_id,
            group = %task.assignee_group_name,
            "Creating human task"
        );
        self.put_task(&task)
            .await
            .map_err(|e| e.during(format!("create human task {}", task.task_id)))
    }

    async fn get_task(
        &self,
        process_id: &str,
        task_id: &str,
    ) -> Result<HumanTask, RemoteCallError> {
        self.fetch(process_id, task_id)
            .await
            .map_err(|e| e.during(format!("get human task {process_id}:{task_id}")))
    }

    async fn update_status(
        &self,
        process_id: &str,
        task_id: &str,
        status: Status,
        comment: Option<&str>,
    ) -> Result<(), RemoteCallError> {
        self.put_status(process_id, task_id, status, comment)
            .await
            .map_err(|e| e.during(format!("update human task {process_id}:{task_id}")))
    }
}
