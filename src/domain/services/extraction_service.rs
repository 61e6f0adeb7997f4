// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::config::settings::Settings;
use crate::domain::models::listing::ListingRecord;
use crate::domain::models::page::RenderedPage;
use crate::domain::models::scraping_result::NewScrapingResult;
use crate::domain::repositories::storage_repository::StorageRepository;
use crate::domain::services::listing_merger::ListingMerger;
use crate::domain::services::llm_service::{parse_json_content, ChatRequest, LLMServiceTrait};
use crate::utils::errors::ExtractionError;
use crate::utils::markdown::{count_top_level_headings, split_into_chunks};
use crate::utils::url_utils::safe_file_name;

/// 元数据中出现这些词说明页面是列表/搜索页而不是单个房源
pub const MULTI_LISTING_KEYWORDS: &[&str] = &["listings", "properties", "results", "search", "for sale"];

const EXTRACTION_SYSTEM_PROMPT: &str =
    "You are an expert at extracting structured real-estate listing data from web pages. You output only valid JSON.";

/// 页面被拒绝的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// 抓取返回非 2xx 状态码
    FetchFailed(u16),
    /// 顶级标题数量不是 1
    HeadingCount(usize),
    /// 元数据包含多房源关键词
    MultiListingMetadata(String),
    /// LLM 没有产出任何可用数据
    NoExtraction,
    /// 缺少标题、价格或文件
    MissingMandatoryFields,
}

impl RejectReason {
    /// 指标标签
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::FetchFailed(_) => "fetch_failed",
            RejectReason::HeadingCount(_) => "heading_count",
            RejectReason::MultiListingMetadata(_) => "multi_listing",
            RejectReason::NoExtraction => "no_extraction",
            RejectReason::MissingMandatoryFields => "missing_mandatory_fields",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::FetchFailed(status) => write!(f, "fetch returned status {}", status),
            RejectReason::HeadingCount(count) => {
                write!(f, "expected exactly one top-level heading, found {}", count)
            }
            RejectReason::MultiListingMetadata(keyword) => {
                write!(f, "metadata mentions '{}'", keyword)
            }
            RejectReason::NoExtraction => f.write_str("no listing data extracted"),
            RejectReason::MissingMandatoryFields => {
                f.write_str("missing listing title, price or files")
            }
        }
    }
}

/// 页面抽取结果
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Accepted(NewScrapingResult),
    Rejected(RejectReason),
}

/// 提取服务
///
/// 负责把渲染后的房源页面转换为待入库的抓取结果：
/// 1. 保存各渲染版本（失败不影响后续流程）
/// 2. 检查顶级标题数量与元数据关键词
/// 3. 按分块调用 LLM 抽取，合并分块结果
/// 4. 严格校验，失败时退回到必填字段检查
pub struct ExtractionService {
    llm: Arc<dyn LLMServiceTrait>,
    storage: Arc<dyn StorageRepository>,
    chunk_chars: usize,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ExtractionService {
    pub fn new(
        llm: Arc<dyn LLMServiceTrait>,
        storage: Arc<dyn StorageRepository>,
        settings: &Settings,
    ) -> Self {
        Self {
            llm,
            storage,
            chunk_chars: settings.extraction.chunk_chars,
            temperature: settings.llm.extraction_temperature,
            max_tokens: Some(settings.llm.max_tokens),
        }
    }

    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars;
        self
    }

    /// 处理单个页面
    ///
    /// 拒绝页面不是错误；只有 LLM 调用失败或分块结构错误才返回 `Err`。
    pub async fn extract(
        &self,
        page: &RenderedPage,
        target_id: &str,
    ) -> Result<Extraction, ExtractionError> {
        self.persist_renderings(page, target_id).await;

        if let Some(reason) = Self::check_page(page) {
            return Ok(Extraction::Rejected(reason));
        }

        let outputs = self.extract_chunks(&page.fit_markdown).await?;
        let record = match Self::resolve_record(&outputs)? {
            Ok(record) => record,
            Err(reason) => return Ok(Extraction::Rejected(reason)),
        };

        info!(url = %page.url, "Listing extracted");
        Ok(Extraction::Accepted(NewScrapingResult::scraped(
            page.url.clone(),
            target_id,
            record,
            Utc::now(),
        )))
    }

    /// 抽取前的页面检查
    pub fn check_page(page: &RenderedPage) -> Option<RejectReason> {
        let headings = count_top_level_headings(&page.raw_markdown);
        if headings != 1 {
            return Some(RejectReason::HeadingCount(headings));
        }

        let metadata = &page.metadata;
        let fields = [
            &metadata.title,
            &metadata.description,
            &metadata.og_title,
            &metadata.og_description,
        ];
        for value in fields.into_iter().flatten() {
            let lowered = value.to_lowercase();
            if let Some(keyword) = MULTI_LISTING_KEYWORDS.iter().find(|k| lowered.contains(*k)) {
                return Some(RejectReason::MultiListingMetadata(keyword.to_string()));
            }
        }

        None
    }

    /// 把 LLM 输出整理成房源记录
    ///
    /// 外层 `Err` 表示分块结构错误；内层 `Err` 表示页面被拒绝。
    pub fn resolve_record(
        outputs: &[Value],
    ) -> Result<Result<ListingRecord, RejectReason>, ExtractionError> {
        let non_empty: Vec<Value> = outputs
            .iter()
            .filter(|v| !matches!(v, Value::Object(map) if map.is_empty()))
            .cloned()
            .collect();
        if non_empty.is_empty() {
            return Ok(Err(RejectReason::NoExtraction));
        }

        let record = ListingMerger::merge(&non_empty)?;

        if let Err(errors) = record.validate() {
            if !record.has_mandatory_fields() {
                debug!("Strict validation failed without fallback: {}", errors);
                return Ok(Err(RejectReason::MissingMandatoryFields));
            }
            warn!("Strict validation failed, accepting record with mandatory fields: {}", errors);
        }

        if !record.has_mandatory_fields() {
            return Ok(Err(RejectReason::MissingMandatoryFields));
        }

        Ok(Ok(record))
    }

    async fn persist_renderings(&self, page: &RenderedPage, target_id: &str) {
        let safe_url = safe_file_name(&page.url);
        let saves = page
            .renderings()
            .into_iter()
            .filter(|(_, content)| !content.trim().is_empty())
            .map(|(kind, content)| {
                let key = format!("markdown_{}/{}_{}.md", target_id, kind, safe_url);
                async move {
                    let result = self.storage.save(&key, content.as_bytes()).await;
                    (key, result)
                }
            });

        for (key, result) in join_all(saves).await {
            match result {
                Ok(()) => debug!("Saved {}", key),
                Err(e) => warn!("Failed to save {}: {}", key, e),
            }
        }
    }

    async fn extract_chunks(&self, markdown: &str) -> Result<Vec<Value>, ExtractionError> {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(ListingRecord))?;
        let chunks = split_into_chunks(markdown, self.chunk_chars);
        let mut outputs = Vec::new();

        for (index, chunk) in chunks.iter().enumerate() {
            let request = ChatRequest {
                system: EXTRACTION_SYSTEM_PROMPT.to_string(),
                prompt: extraction_prompt(&schema, chunk),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };
            let content = self.llm.complete(&request).await?;

            match parse_json_content(&content) {
                Ok(Value::Array(items)) => outputs.extend(items),
                Ok(value @ Value::Object(_)) => outputs.push(value),
                Ok(other) => warn!(chunk = index, "Ignoring non-object LLM output: {}", other),
                Err(e) => warn!(chunk = index, "Skipping chunk with unparseable LLM output: {}", e),
            }
        }

        debug!(chunks = chunks.len(), outputs = outputs.len(), "Chunked extraction finished");
        Ok(outputs)
    }
}

fn extraction_prompt(schema: &str, chunk: &str) -> String {
    format!(
        "Extract the single property listing described on this page according to this JSON schema:\n\
        {}\n\n\
        Return a JSON object, or a JSON array of partial objects if the content is split. \
        Put amenities into the `features` list as {{\"feature\": ..., \"value\": ...}} entries. \
        `files` must contain absolute image or document URLs. \
        Return ONLY the JSON, no markdown formatting.\n\n\
        Page content:\n{}",
        schema, chunk
    )
}

#[cfg(test)]
#[path = "extraction_service_test.rs"]
mod tests;
