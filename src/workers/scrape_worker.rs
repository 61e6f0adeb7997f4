// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::models::task::{PipelineTask, QueueName, ScrapeTask};
use crate::domain::repositories::listing_store::ListingStore;
use crate::domain::services::extraction_service::{Extraction, ExtractionService, RejectReason};
use crate::engines::traits::{ScrapeRequest, ScraperEngine};
use crate::infrastructure::metrics::record_page_rejected;
use crate::queue::run_lock::RunLock;
use crate::queue::task_queue::TaskQueue;
use crate::utils::errors::WorkerError;
use crate::utils::markdown::render_page;
use crate::workers::worker::{StageOutcome, Worker};

/// 抓取工作者
///
/// 从 `scraping` 队列取出一个目标地址，抓取并抽取房源，
/// 通过校验的结果写入远程存储。
pub struct ScrapeWorker {
    queue: Arc<dyn TaskQueue>,
    lock: RunLock,
    engine: Arc<dyn ScraperEngine>,
    extraction: Arc<ExtractionService>,
    store: Arc<dyn ListingStore>,
    timeout: Duration,
    worker_id: Uuid,
}

impl ScrapeWorker {
    /// 创建新的抓取工作器实例
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        lock: RunLock,
        engine: Arc<dyn ScraperEngine>,
        extraction: Arc<ExtractionService>,
        store: Arc<dyn ListingStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            queue,
            lock,
            engine,
            extraction,
            store,
            timeout,
            worker_id: Uuid::new_v4(),
        }
    }

    #[instrument(skip(self, task), fields(worker_id = %self.worker_id, url = %task.website_url, target_id = %task.target_id))]
    async fn process_task(&self, task: ScrapeTask) -> Result<StageOutcome, WorkerError> {
        info!("Processing scrape task");

        let request = ScrapeRequest::new(&task.website_url, self.timeout);
        let response = self.engine.scrape(&request).await?;
        if !response.is_success() {
            return Ok(self.reject(task, RejectReason::FetchFailed(response.status_code)));
        }

        let page = render_page(&task.website_url, &response.content);
        let result = match self.extraction.extract(&page, &task.target_id).await? {
            Extraction::Accepted(result) => result,
            Extraction::Rejected(reason) => return Ok(self.reject(task, reason)),
        };

        let status = result.status;
        let id = self.store.create_scraping_result(&result).await?;
        info!(
            scraping_result_id = %id,
            response_time_ms = response.response_time_ms,
            "Scraping result created"
        );
        Ok(StageOutcome::Completed {
            scraping_result_id: id,
            status,
        })
    }

    fn reject(&self, task: ScrapeTask, reason: RejectReason) -> StageOutcome {
        warn!(url = %task.website_url, "Page rejected: {}", reason);
        record_page_rejected(reason.label());
        StageOutcome::Rejected {
            url: task.website_url,
            reason,
        }
    }
}

#[async_trait]
impl Worker for ScrapeWorker {
    async fn run_once(&self) -> Result<StageOutcome, WorkerError> {
        let Some(_guard) = self.lock.guard()? else {
            info!("Another stage is running, skipping scrape run");
            return Ok(StageOutcome::LockBusy);
        };

        match self.queue.dequeue(QueueName::Scraping).await? {
            None => {
                info!("No pending scrape tasks");
                Ok(StageOutcome::Idle)
            }
            Some(PipelineTask::Scrape(task)) => self.process_task(task).await,
            Some(PipelineTask::Refine(task)) => Err(WorkerError::InvalidTask(format!(
                "refine task for result {} found in scraping queue",
                task.scraping_result_id
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "scrape"
    }
}
