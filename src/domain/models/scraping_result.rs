// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::agent_status::{AgentName, AgentState, AgentStatusEntry};
use super::lenient::{optional_string, string_or_empty};
use super::listing::ListingRecord;

/// 抓取完成后的进度
pub const SCRAPED_PROGRESS: u8 = 33;
/// 清洗完成后的进度
pub const CLEANED_PROGRESS: u8 = 66;
/// 增强完成后的进度
pub const ENHANCED_PROGRESS: u8 = 100;

/// 抓取结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    #[serde(rename = "In Progress")]
    InProgress,
    Success,
    Failed,
}

/// `POST /scraping-results` 请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewScrapingResult {
    pub source_url: String,
    pub data: ListingRecord,
    pub progress: u8,
    pub status: ResultStatus,
    pub scraped_at: DateTime<Utc>,
    pub target_id: String,
    pub agent_status: Vec<AgentStatusEntry>,
}

impl NewScrapingResult {
    /// 抓取阶段产出的结果：抓取代理成功，清洗与增强代理排队
    pub fn scraped(
        source_url: impl Into<String>,
        target_id: impl Into<String>,
        data: ListingRecord,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            data,
            progress: SCRAPED_PROGRESS,
            status: ResultStatus::InProgress,
            scraped_at: now,
            target_id: target_id.into(),
            agent_status: vec![
                AgentStatusEntry::new(AgentName::Scraping, AgentState::Success, now),
                AgentStatusEntry::new(AgentName::Cleaning, AgentState::Queued, now),
                AgentStatusEntry::new(AgentName::Extracting, AgentState::Queued, now),
            ],
        }
    }
}

/// 远程存储中的抓取结果
///
/// `data` 保持原始 JSON，失败时原样回写。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredScrapingResult {
    #[serde(default, deserialize_with = "optional_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub source_url: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub target_id: String,
    #[serde(default, deserialize_with = "optional_string")]
    pub scraped_at: Option<String>,
}

/// `PUT /scraping-results` 请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapingResultUpdate {
    pub id: String,
    pub source_url: String,
    pub data: Value,
    pub progress: u8,
    pub status: ResultStatus,
    pub target_id: String,
    pub last_updated: DateTime<Utc>,
    pub scraped_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
