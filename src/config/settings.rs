// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use crate::domain::models::scraping_result::ResultStatus;

/// 环境变量前缀，例如 `LISTING_PIPELINE__LLM__API_KEY`
pub const ENV_PREFIX: &str = "LISTING_PIPELINE";

/// 应用程序配置设置
///
/// 包含远程存储、LLM、队列、锁、存储、抓取、抽取、流水线和指标等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 远程房源管理 API 配置
    pub remote_api: RemoteApiSettings,
    /// LLM 配置
    pub llm: LlmSettings,
    /// 任务队列配置
    pub queue: QueueSettings,
    /// 单实例运行锁配置
    pub lock: LockSettings,
    /// 存储配置
    pub storage: StorageSettings,
    /// 页面抓取配置
    pub scraper: ScraperSettings,
    /// 分块抽取配置
    pub extraction: ExtractionSettings,
    /// 流水线阶段配置
    pub pipeline: PipelineSettings,
    /// 指标导出配置
    pub metrics: MetricsSettings,
}

/// 远程房源管理 API 配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteApiSettings {
    /// API 基础 URL
    pub base_url: String,
    /// Bearer 令牌
    pub bearer_token: Option<String>,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

/// LLM 配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    /// API 密钥
    pub api_key: Option<String>,
    /// 模型名称
    pub model: String,
    /// API 基础 URL
    pub api_base_url: String,
    /// 单次响应的最大令牌数
    pub max_tokens: u32,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 抽取阶段温度
    pub extraction_temperature: f32,
    /// 清洗阶段温度
    pub cleaning_temperature: f32,
    /// 增强阶段温度
    pub enhancement_temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    /// 队列文件路径
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockSettings {
    /// 锁文件路径
    pub path: String,
    /// 超过该秒数的锁视为残留，未设置时永不过期
    pub stale_after_secs: Option<u64>,
}

/// 存储配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// 存储类型 (local, memory)
    pub storage_type: String,
    /// 本地存储路径 (当 type=local 时使用)
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionSettings {
    /// 每个分块的最大字符数
    pub chunk_chars: usize,
}

/// 流水线阶段配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    /// 清洗成功后保留的文件数，0 表示不截断
    pub cleaning_files_limit: usize,
    /// 清洗成功后抓取结果的状态
    pub cleaning_success_status: ResultStatus,
    /// 调度循环间隔（秒）
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    /// Prometheus 监听地址
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 加载顺序：内置默认值 → `config/default` → `config/{APP_ENVIRONMENT}` → 环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 只包含内置默认值的构建器
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            // Remote listing API
            .set_default("remote_api.base_url", "http://localhost:8080")?
            .set_default("remote_api.timeout_secs", 30)?
            // LLM
            .set_default("llm.model", "gpt-4")?
            .set_default("llm.api_base_url", "https://api.openai.com/v1")?
            .set_default("llm.max_tokens", 1000)?
            .set_default("llm.timeout_secs", 120)?
            .set_default("llm.extraction_temperature", 0.0)?
            .set_default("llm.cleaning_temperature", 0.1)?
            .set_default("llm.enhancement_temperature", 0.3)?
            // Queue and lock files
            .set_default("queue.path", "queue.json")?
            .set_default("lock.path", "processing.lock")?
            // Storage
            .set_default("storage.storage_type", "local")?
            .set_default("storage.local_path", "./storage")?
            // Scraper
            .set_default("scraper.user_agent", "listing-pipeline/0.1")?
            .set_default("scraper.timeout_secs", 30)?
            .set_default("extraction.chunk_chars", 8000)?
            // Pipeline stages
            .set_default("pipeline.cleaning_files_limit", 2)?
            .set_default("pipeline.cleaning_success_status", "In Progress")?
            .set_default("pipeline.poll_interval_secs", 60)?
            // Metrics
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }
}
