// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::agent_status::{AgentName, AgentStatusUpdate, QueuedAgentTask};
use crate::domain::models::scraping_result::{
    NewScrapingResult, ScrapingResultUpdate, StoredScrapingResult,
};

/// 远程存储错误类型
#[derive(Error, Debug)]
pub enum RemoteStoreError {
    /// 请求失败
    #[error("Remote store request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// 非 2xx 响应
    #[error("Remote store returned {status}: {body}")]
    Status { status: u16, body: String },
    /// 响应结构不符合预期
    #[error("Unexpected remote store response: {0}")]
    UnexpectedResponse(String),
}

/// 房源管理系统的远程存储
///
/// 流水线各阶段只通过该特质读写抓取结果与代理状态
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// 指定代理排队中的状态行，按服务端顺序返回
    async fn queued_agent_tasks(
        &self,
        agent: AgentName,
    ) -> Result<Vec<QueuedAgentTask>, RemoteStoreError>;

    /// 读取抓取结果
    async fn get_scraping_result(&self, id: &str) -> Result<StoredScrapingResult, RemoteStoreError>;

    /// 覆盖更新抓取结果
    async fn update_scraping_result(
        &self,
        update: &ScrapingResultUpdate,
    ) -> Result<(), RemoteStoreError>;

    /// 更新代理状态
    async fn update_agent_status(&self, update: &AgentStatusUpdate) -> Result<(), RemoteStoreError>;

    /// 创建抓取结果，返回新记录的 ID
    async fn create_scraping_result(
        &self,
        result: &NewScrapingResult,
    ) -> Result<String, RemoteStoreError>;
}
