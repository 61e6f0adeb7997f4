// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::settings::RemoteApiSettings;
use crate::domain::models::agent_status::{AgentName, AgentStatusUpdate, QueuedAgentTask};
use crate::domain::models::lenient::scalar_to_string;
use crate::domain::models::scraping_result::{
    NewScrapingResult, ScrapingResultUpdate, StoredScrapingResult,
};
use crate::domain::repositories::listing_store::{ListingStore, RemoteStoreError};

/// 基于 HTTP 的远程存储客户端
///
/// 响应统一包裹在 `data` 中：
/// - 排队列表位于 `data.rows.rows`，也接受 `data.rows` 或 `data` 直接是数组
/// - 单条记录位于 `data`
/// - 新建记录的 ID 位于 `data.id`
pub struct HttpListingStore {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpListingStore {
    pub fn new(settings: &RemoteApiSettings) -> Result<Self, RemoteStoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            bearer_token: settings.bearer_token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        request: RequestBuilder,
        body: &B,
    ) -> Result<Value, RemoteStoreError> {
        let response = self.authorize(request).json(body).send().await?;
        read_body(response).await
    }

    async fn get_json(&self, request: RequestBuilder) -> Result<Value, RemoteStoreError> {
        let response = self.authorize(request).send().await?;
        read_body(response).await
    }
}

async fn read_body(response: Response) -> Result<Value, RemoteStoreError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(RemoteStoreError::Status {
            status: status.as_u16(),
            body: text,
        });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| RemoteStoreError::UnexpectedResponse(e.to_string()))
}

/// 取出排队列表所在的数组
fn queued_rows(body: &Value) -> Option<&Vec<Value>> {
    let data = body.get("data").unwrap_or(body);
    data.pointer("/rows/rows")
        .and_then(Value::as_array)
        .or_else(|| data.get("rows").and_then(Value::as_array))
        .or_else(|| data.as_array())
}

fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[async_trait]
impl ListingStore for HttpListingStore {
    async fn queued_agent_tasks(
        &self,
        agent: AgentName,
    ) -> Result<Vec<QueuedAgentTask>, RemoteStoreError> {
        let request = self
            .client
            .get(self.url("agent-status/queued"))
            .query(&[("agent_name", agent.as_str())]);
        let body = self.get_json(request).await?;

        let rows = queued_rows(&body).ok_or_else(|| {
            RemoteStoreError::UnexpectedResponse("queued agent status rows not found".into())
        })?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<QueuedAgentTask>(row.clone()) {
                Ok(task) if task.id.is_some() => tasks.push(task),
                Ok(_) => warn!("Skipping queued row without id: {}", row),
                Err(e) => warn!("Skipping malformed queued row: {}", e),
            }
        }
        debug!(agent = agent.as_str(), count = tasks.len(), "Fetched queued agent tasks");
        Ok(tasks)
    }

    async fn get_scraping_result(&self, id: &str) -> Result<StoredScrapingResult, RemoteStoreError> {
        let request = self.client.get(self.url(&format!("scraping-results/{}", id)));
        let body = unwrap_data(self.get_json(request).await?);
        serde_json::from_value(body).map_err(|e| RemoteStoreError::UnexpectedResponse(e.to_string()))
    }

    async fn update_scraping_result(
        &self,
        update: &ScrapingResultUpdate,
    ) -> Result<(), RemoteStoreError> {
        let request = self.client.put(self.url("scraping-results"));
        self.send_json(request, update).await?;
        debug!(id = %update.id, status = ?update.status, "Scraping result updated");
        Ok(())
    }

    async fn update_agent_status(&self, update: &AgentStatusUpdate) -> Result<(), RemoteStoreError> {
        let request = self.client.put(self.url("agent-status"));
        self.send_json(request, update).await?;
        debug!(id = %update.id, status = ?update.status, "Agent status updated");
        Ok(())
    }

    async fn create_scraping_result(
        &self,
        result: &NewScrapingResult,
    ) -> Result<String, RemoteStoreError> {
        let request = self.client.post(self.url("scraping-results"));
        let body = self.send_json(request, result).await?;

        body.pointer("/data/id")
            .or_else(|| body.get("id"))
            .and_then(scalar_to_string)
            .ok_or_else(|| {
                RemoteStoreError::UnexpectedResponse("created scraping result has no id".into())
            })
    }
}
