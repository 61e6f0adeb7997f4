// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::settings::LlmSettings;
use crate::utils::errors::LlmError;

/// 单轮对话请求
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// 系统指令
    pub system: String,
    /// 用户提示
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

#[async_trait]
pub trait LLMServiceTrait: Send + Sync {
    /// 发送单轮对话，返回模型输出的原始文本
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

/// LLM服务 - 处理与 OpenAI 兼容接口的交互
///
/// # 配置
///
/// 通过 `llm` 配置节设置：
/// - `api_key` - LLM API密钥
/// - `model` - 使用的模型名称（默认为 gpt-4）
/// - `api_base_url` - LLM API基础URL
pub struct LLMService {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_base_url: String,
}

#[async_trait]
impl LLMServiceTrait for LLMService {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        LLMService::complete(self, request).await
    }
}

impl LLMService {
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn new_with_config(api_key: String, model: String, api_base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: Some(api_key),
            model,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 调用 chat completions 接口
    ///
    /// # 错误
    /// * 当LLM API密钥未配置时返回错误
    /// * 当LLM服务返回非 2xx 状态或响应中没有消息内容时返回错误
    pub async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let api_key = self.api_key.as_ref().ok_or(LlmError::MissingApiKey)?;

        let mut request_body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": request.system
                },
                {
                    "role": "user",
                    "content": request.prompt
                }
            ],
            "temperature": request.temperature
        });
        if let Some(max_tokens) = request.max_tokens {
            request_body["max_tokens"] = json!(max_tokens);
        }

        let url = format!("{}/chat/completions", self.api_base_url);
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let body: Value = response.json().await?;

        if let Some(usage) = body.get("usage") {
            debug!(
                prompt_tokens = usage["prompt_tokens"].as_u64().unwrap_or(0),
                completion_tokens = usage["completion_tokens"].as_u64().unwrap_or(0),
                "LLM completion finished"
            );
        }

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".into()))
    }
}

/// 解析模型输出中的 JSON，允许外层包裹 Markdown 代码块
///
/// 先按原文解析；只有失败时才尝试取出代码块内容。
pub fn parse_json_content(content: &str) -> Result<Value, LlmError> {
    let trimmed = content.trim();
    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(err) => match fenced_body(trimmed) {
            Some(body) => Ok(serde_json::from_str(body)?),
            None => Err(err.into()),
        },
    }
}

/// 围栏代码块，允许前后带说明文字
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("Failed to compile code fence regex")
});

fn fenced_body(content: &str) -> Option<&str> {
    CODE_FENCE
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|body| body.as_str().trim())
}
