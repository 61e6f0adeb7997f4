// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::settings::Settings;
use crate::domain::models::agent_status::{AgentName, AgentState};
use crate::domain::models::lenient::scalar_to_string;
use crate::domain::models::listing::{FeatureSet, ListingRecord};
use crate::domain::models::scraping_result::{ResultStatus, CLEANED_PROGRESS, ENHANCED_PROGRESS};
use crate::domain::models::task::QueueName;
use crate::domain::models::text_field::TextField;
use crate::domain::services::llm_service::{parse_json_content, ChatRequest, LLMServiceTrait};
use crate::utils::errors::LlmError;

/// 精炼阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefineStage {
    /// 翻译并规范化文本
    Cleaning,
    /// 润色文本，流水线的最后一步
    Enhancement,
}

impl RefineStage {
    /// 对应的代理名称，增强阶段沿用 "Extracting Agent"
    pub fn agent(self) -> AgentName {
        match self {
            RefineStage::Cleaning => AgentName::Cleaning,
            RefineStage::Enhancement => AgentName::Extracting,
        }
    }

    /// 本地队列名称
    pub fn queue(self) -> QueueName {
        match self {
            RefineStage::Cleaning => QueueName::Cleaning,
            RefineStage::Enhancement => QueueName::Extracting,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RefineStage::Cleaning => "cleaning",
            RefineStage::Enhancement => "enhancement",
        }
    }

    fn system_prompt(self) -> &'static str {
        match self {
            RefineStage::Cleaning => "You are an expert in text refinement and translation.",
            RefineStage::Enhancement => {
                "You are a skilled writer creating polished property listing content."
            }
        }
    }

    fn instructions(self) -> &'static str {
        match self {
            RefineStage::Cleaning => {
                "Translate the following text fields to English if they are not already in English, \
                and refine them to be clear, concise, and grammatically correct. \
                Ensure 'listing_title' is fully translated to English and cleaned up. \
                For 'features', translate the text within the JSON structure while preserving the format. \
                Return the results as a JSON object with the same keys as provided below."
            }
            RefineStage::Enhancement => {
                "Enhance the following text fields for a property listing to be polished, concise, \
                and appealing in English. Rewrite each field to improve clarity and attractiveness \
                while maintaining its meaning. \
                For 'features', enhance the text within the JSON structure while preserving the format. \
                Return the results in JSON format with the same keys."
            }
        }
    }
}

/// 精炼阶段的持久化策略
#[derive(Debug, Clone, PartialEq)]
pub struct RefinePolicy {
    pub stage: RefineStage,
    /// 成功时抓取结果的状态
    pub success_status: ResultStatus,
    /// 写回的进度，成功失败相同
    pub progress: u8,
    /// 成功时保留的文件数
    pub files_limit: Option<usize>,
    /// 空字符串写回为 null
    pub blank_as_null: bool,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl RefinePolicy {
    pub fn cleaning(settings: &Settings) -> Self {
        let limit = settings.pipeline.cleaning_files_limit;
        Self {
            stage: RefineStage::Cleaning,
            success_status: settings.pipeline.cleaning_success_status,
            progress: CLEANED_PROGRESS,
            files_limit: (limit > 0).then_some(limit),
            blank_as_null: false,
            temperature: settings.llm.cleaning_temperature,
            max_tokens: Some(settings.llm.max_tokens),
        }
    }

    pub fn enhancement(settings: &Settings) -> Self {
        Self {
            stage: RefineStage::Enhancement,
            success_status: ResultStatus::Success,
            progress: ENHANCED_PROGRESS,
            files_limit: None,
            blank_as_null: true,
            temperature: settings.llm.enhancement_temperature,
            max_tokens: Some(settings.llm.max_tokens),
        }
    }
}

/// 精炼失败原因
#[derive(Error, Debug)]
pub enum RefineError {
    #[error("stored listing data is not a valid record: {0}")]
    InvalidStoredData(#[source] serde_json::Error),

    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("LLM response is not a JSON object")]
    NotAnObject,

    #[error("field '{field}' could not be applied: {reason}")]
    InvalidField { field: TextField, reason: String },

    #[error("refined record could not be serialized: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// 一次精炼的结果
#[derive(Debug, Clone, PartialEq)]
pub struct RefineOutcome {
    /// 要写回的数据；失败时与输入完全相同
    pub data: Value,
    pub status: ResultStatus,
    pub agent_state: AgentState,
    pub progress: u8,
    pub error: Option<String>,
}

impl RefineOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// 精炼服务
///
/// 将记录展平为文本字段交给 LLM 改写，再按 [`TextField`] 路由表写回。
/// 任何一步失败都会原样保留输入数据，并把状态标记为 Failed。
pub struct RefinementService {
    llm: Arc<dyn LLMServiceTrait>,
    policy: RefinePolicy,
}

impl RefinementService {
    pub fn new(llm: Arc<dyn LLMServiceTrait>, policy: RefinePolicy) -> Self {
        Self { llm, policy }
    }

    pub fn policy(&self) -> &RefinePolicy {
        &self.policy
    }

    pub async fn refine(&self, original: &Value) -> RefineOutcome {
        match self.transform(original).await {
            Ok(data) => RefineOutcome {
                data,
                status: self.policy.success_status,
                agent_state: AgentState::Success,
                progress: self.policy.progress,
                error: None,
            },
            Err(e) => {
                warn!(stage = self.policy.stage.name(), "Refinement failed: {}", e);
                RefineOutcome {
                    data: original.clone(),
                    status: ResultStatus::Failed,
                    agent_state: AgentState::Failed,
                    progress: self.policy.progress,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn transform(&self, original: &Value) -> Result<Value, RefineError> {
        let mut record: ListingRecord =
            serde_json::from_value(original.clone()).map_err(RefineError::InvalidStoredData)?;

        let stage = self.policy.stage;
        let request = ChatRequest {
            system: stage.system_prompt().to_string(),
            prompt: build_prompt(stage.instructions(), &record),
            temperature: self.policy.temperature,
            max_tokens: self.policy.max_tokens,
        };
        let content = self.llm.complete(&request).await?;
        debug!(stage = stage.name(), "Raw LLM response: {}", content);

        let Value::Object(fields) = parse_json_content(&content)? else {
            return Err(RefineError::NotAnObject);
        };
        apply_refined_fields(&mut record, &fields, self.policy.blank_as_null)?;

        record.amenities = None;
        if let Some(limit) = self.policy.files_limit {
            record.files.truncate(limit);
        }

        record.to_value().map_err(RefineError::Serialize)
    }
}

/// 构造 `key: value` 行加空模板的提示
pub fn build_prompt(instructions: &str, record: &ListingRecord) -> String {
    let mut prompt = format!("{}\n\nInput data:\n", instructions);
    for field in TextField::ALL {
        prompt.push_str(&format!("{}: {}\n", field.key(), field.read(record)));
    }

    prompt.push_str("\nReturn the data in this JSON format:\n{\n");
    let template: Vec<String> = TextField::ALL
        .iter()
        .map(|field| format!("  \"{}\": \"\"", field.key()))
        .collect();
    prompt.push_str(&template.join(",\n"));
    prompt.push_str("\n}");
    prompt
}

/// 把 LLM 返回的扁平字段写回记录
///
/// 响应中缺失的键保持原值；`features` 为空白字符串时也保持原值。
pub fn apply_refined_fields(
    record: &mut ListingRecord,
    fields: &Map<String, Value>,
    blank_as_null: bool,
) -> Result<(), RefineError> {
    for field in TextField::ALL {
        let Some(value) = fields.get(field.key()) else {
            continue;
        };

        if let Some(slot) = field.scalar_mut(record) {
            *slot = match value {
                Value::Null => None,
                other => {
                    let text = scalar_to_string(other).ok_or_else(|| RefineError::InvalidField {
                        field,
                        reason: "expected a string".to_string(),
                    })?;
                    if blank_as_null && text.trim().is_empty() {
                        None
                    } else {
                        Some(text)
                    }
                }
            };
            continue;
        }

        if let Some(features) = parse_features(value).map_err(|reason| RefineError::InvalidField {
            field,
            reason,
        })? {
            record.features = features;
        }
    }
    Ok(())
}

fn parse_features(value: &Value) -> Result<Option<FeatureSet>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) if text.trim().is_empty() => Ok(None),
        Value::String(text) => serde_json::from_str(text)
            .map(Some)
            .map_err(|e| e.to_string()),
        Value::Array(_) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| e.to_string()),
        _ => Err("expected JSON text or an array".to_string()),
    }
}

#[cfg(test)]
#[path = "refinement_test.rs"]
mod tests;
