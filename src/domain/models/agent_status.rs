// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lenient::optional_string;

/// 流水线中的代理名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentName {
    #[serde(rename = "Scraping Agent")]
    Scraping,
    #[serde(rename = "Cleaning Agent")]
    Cleaning,
    #[serde(rename = "Extracting Agent")]
    Extracting,
}

impl AgentName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Scraping => "Scraping Agent",
            AgentName::Cleaning => "Cleaning Agent",
            AgentName::Extracting => "Extracting Agent",
        }
    }
}

/// 代理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentState {
    Queued,
    #[serde(rename = "In Progress")]
    InProgress,
    Success,
    Failed,
}

/// 随抓取结果一起创建的代理状态条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatusEntry {
    pub agent_name: AgentName,
    pub status: AgentState,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraping_result_id: Option<String>,
}

impl AgentStatusEntry {
    pub fn new(agent_name: AgentName, status: AgentState, now: DateTime<Utc>) -> Self {
        Self {
            agent_name,
            status,
            start_time: now,
            end_time: Some(now),
            scraping_result_id: None,
        }
    }
}

/// 远程存储中排队等待处理的代理状态行
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueuedAgentTask {
    #[serde(deserialize_with = "optional_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    pub scraping_result_id: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    pub start_time: Option<String>,
}

/// `PUT /agent-status` 请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStatusUpdate {
    pub id: String,
    pub agent_name: AgentName,
    pub status: AgentState,
    pub start_time: String,
    pub end_time: DateTime<Utc>,
    pub scraping_result_id: String,
}
