// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

use crate::domain::repositories::listing_store::RemoteStoreError;
use crate::domain::repositories::storage_repository::StorageError;
use crate::domain::services::listing_merger::MergeError;
use crate::engines::traits::EngineError;
use crate::queue::run_lock::LockError;
use crate::queue::task_queue::QueueError;

/// LLM 调用错误类型
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM API 密钥未配置")]
    MissingApiKey,

    #[error("LLM 请求失败: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM API 返回错误: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("LLM 响应格式无效: {0}")]
    InvalidResponse(String),

    #[error("LLM 输出不是有效 JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

/// 页面抽取错误类型
///
/// 页面被拒绝不属于错误，见 `Extraction::Rejected`。
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("分块合并失败: {0}")]
    Merge(#[from] MergeError),

    #[error("LLM 错误: {0}")]
    Llm(#[from] LlmError),

    #[error("抽取结构生成失败: {0}")]
    Schema(#[from] serde_json::Error),
}

/// Worker错误类型
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("队列错误: {0}")]
    Queue(QueueError),

    #[error("锁错误: {0}")]
    Lock(#[from] LockError),

    #[error("抓取引擎错误: {0}")]
    Engine(#[from] EngineError),

    #[error("抽取错误: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("LLM 错误: {0}")]
    Llm(#[from] LlmError),

    #[error("远程存储错误: {0}")]
    RemoteStore(#[from] RemoteStoreError),

    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    #[error("任务无效: {0}")]
    InvalidTask(String),
}

impl From<QueueError> for WorkerError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::InvalidEntry { .. } => WorkerError::InvalidTask(err.to_string()),
            other => WorkerError::Queue(other),
        }
    }
}
