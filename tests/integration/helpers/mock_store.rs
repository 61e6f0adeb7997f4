// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use listing_pipeline::domain::models::agent_status::{
    AgentName, AgentStatusUpdate, QueuedAgentTask,
};
use listing_pipeline::domain::models::scraping_result::{
    NewScrapingResult, ScrapingResultUpdate, StoredScrapingResult,
};
use listing_pipeline::domain::repositories::listing_store::{ListingStore, RemoteStoreError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// 内存中的远程存储，记录所有写入
#[derive(Default)]
pub struct InMemoryListingStore {
    queued: Mutex<HashMap<AgentName, Vec<QueuedAgentTask>>>,
    results: Mutex<HashMap<String, StoredScrapingResult>>,
    pub created: Mutex<Vec<NewScrapingResult>>,
    pub result_updates: Mutex<Vec<ScrapingResultUpdate>>,
    pub agent_updates: Mutex<Vec<AgentStatusUpdate>>,
}

impl InMemoryListingStore {
    pub fn queue_agent_task(
        &self,
        agent: AgentName,
        id: &str,
        scraping_result_id: &str,
        start_time: Option<&str>,
    ) {
        self.queue_agent_row(
            agent,
            QueuedAgentTask {
                id: Some(id.to_string()),
                scraping_result_id: Some(scraping_result_id.to_string()),
                start_time: start_time.map(str::to_string),
            },
        );
    }

    /// 直接追加一条排队行，字段可以缺失
    pub fn queue_agent_row(&self, agent: AgentName, row: QueuedAgentTask) {
        self.queued.lock().unwrap().entry(agent).or_default().push(row);
    }

    pub fn insert_result(&self, id: &str, data: Value) {
        self.results.lock().unwrap().insert(
            id.to_string(),
            StoredScrapingResult {
                id: Some(id.to_string()),
                source_url: format!("https://listings.example/{}", id),
                data,
                target_id: "target-1".to_string(),
                scraped_at: Some("2025-01-01T00:00:00Z".to_string()),
            },
        );
    }

    pub fn created(&self) -> Vec<NewScrapingResult> {
        self.created.lock().unwrap().clone()
    }

    pub fn result_updates(&self) -> Vec<ScrapingResultUpdate> {
        self.result_updates.lock().unwrap().clone()
    }

    pub fn agent_updates(&self) -> Vec<AgentStatusUpdate> {
        self.agent_updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingStore for InMemoryListingStore {
    async fn queued_agent_tasks(
        &self,
        agent: AgentName,
    ) -> Result<Vec<QueuedAgentTask>, RemoteStoreError> {
        Ok(self
            .queued
            .lock()
            .unwrap()
            .get(&agent)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_scraping_result(&self, id: &str) -> Result<StoredScrapingResult, RemoteStoreError> {
        self.results
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteStoreError::Status {
                status: 404,
                body: format!("scraping result {} not found", id),
            })
    }

    async fn update_scraping_result(
        &self,
        update: &ScrapingResultUpdate,
    ) -> Result<(), RemoteStoreError> {
        self.result_updates.lock().unwrap().push(update.clone());
        Ok(())
    }

    async fn update_agent_status(&self, update: &AgentStatusUpdate) -> Result<(), RemoteStoreError> {
        self.agent_updates.lock().unwrap().push(update.clone());
        Ok(())
    }

    async fn create_scraping_result(
        &self,
        result: &NewScrapingResult,
    ) -> Result<String, RemoteStoreError> {
        let mut created = self.created.lock().unwrap();
        created.push(result.clone());
        Ok(format!("result-{}", created.len()))
    }
}
