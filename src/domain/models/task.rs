// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::lenient::id_string;

/// 队列名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueName {
    Scraping,
    Cleaning,
    Extracting,
}

impl QueueName {
    pub const ALL: [QueueName; 3] = [QueueName::Scraping, QueueName::Cleaning, QueueName::Extracting];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Scraping => "scraping",
            QueueName::Cleaning => "cleaning",
            QueueName::Extracting => "extracting",
        }
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scraping" => Ok(QueueName::Scraping),
            "cleaning" => Ok(QueueName::Cleaning),
            "extracting" => Ok(QueueName::Extracting),
            other => Err(format!("unknown queue: {}", other)),
        }
    }
}

/// 抓取任务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeTask {
    pub website_url: String,
    #[serde(deserialize_with = "id_string")]
    pub target_id: String,
}

/// 清洗/增强任务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineTask {
    #[serde(deserialize_with = "id_string")]
    pub scraping_result_id: String,
    #[serde(deserialize_with = "id_string")]
    pub agent_id: String,
}

/// 队列中的任务描述
///
/// 队列文件里不存储类型标签，按字段结构区分两种任务。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipelineTask {
    Scrape(ScrapeTask),
    Refine(RefineTask),
}

impl PipelineTask {
    pub fn scrape(website_url: impl Into<String>, target_id: impl Into<String>) -> Self {
        PipelineTask::Scrape(ScrapeTask {
            website_url: website_url.into(),
            target_id: target_id.into(),
        })
    }

    pub fn refine(scraping_result_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        PipelineTask::Refine(RefineTask {
            scraping_result_id: scraping_result_id.into(),
            agent_id: agent_id.into(),
        })
    }
}
