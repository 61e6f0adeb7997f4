// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::models::agent_status::AgentStatusUpdate;
use crate::domain::models::scraping_result::ScrapingResultUpdate;
use crate::domain::models::task::PipelineTask;
use crate::domain::repositories::listing_store::ListingStore;
use crate::domain::services::refinement::{RefineStage, RefinementService};
use crate::infrastructure::metrics::record_refine_failure;
use crate::queue::run_lock::RunLock;
use crate::queue::task_queue::TaskQueue;
use crate::utils::errors::WorkerError;
use crate::workers::worker::{StageOutcome, Worker};

/// 待精炼的一条记录
#[derive(Debug, Clone, PartialEq)]
struct RefineJob {
    agent_status_id: String,
    scraping_result_id: String,
    start_time: Option<String>,
}

/// 清洗/增强工作者
///
/// 每次运行处理一条排队记录。本地队列优先，其次是远程存储中
/// 对应代理排在最前的状态行。精炼失败时原始数据照常回写。
pub struct RefineWorker {
    queue: Arc<dyn TaskQueue>,
    lock: RunLock,
    store: Arc<dyn ListingStore>,
    refinement: RefinementService,
    worker_id: Uuid,
}

impl RefineWorker {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        lock: RunLock,
        store: Arc<dyn ListingStore>,
        refinement: RefinementService,
    ) -> Self {
        Self {
            queue,
            lock,
            store,
            refinement,
            worker_id: Uuid::new_v4(),
        }
    }

    fn stage(&self) -> RefineStage {
        self.refinement.policy().stage
    }

    async fn next_job(&self) -> Result<Option<RefineJob>, WorkerError> {
        let stage = self.stage();

        match self.queue.dequeue(stage.queue()).await? {
            Some(PipelineTask::Refine(task)) => {
                debug!(queue = %stage.queue(), "Using locally queued refine task");
                return Ok(Some(RefineJob {
                    agent_status_id: task.agent_id,
                    scraping_result_id: task.scraping_result_id,
                    start_time: None,
                }));
            }
            Some(PipelineTask::Scrape(task)) => {
                return Err(WorkerError::InvalidTask(format!(
                    "scrape task for {} found in {} queue",
                    task.website_url,
                    stage.queue()
                )));
            }
            None => {}
        }

        let rows = self.store.queued_agent_tasks(stage.agent()).await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let agent_status_id = row.id.ok_or_else(|| {
            WorkerError::InvalidTask(format!(
                "queued {} status row has no id",
                stage.agent().as_str()
            ))
        })?;
        let scraping_result_id = row.scraping_result_id.ok_or_else(|| {
            WorkerError::InvalidTask(format!(
                "queued agent status {} has no scraping_result_id",
                agent_status_id
            ))
        })?;

        Ok(Some(RefineJob {
            agent_status_id,
            scraping_result_id,
            start_time: row.start_time,
        }))
    }

    #[instrument(
        skip(self, job, started),
        fields(
            worker_id = %self.worker_id,
            stage = self.stage().name(),
            scraping_result_id = %job.scraping_result_id
        )
    )]
    async fn process_job(
        &self,
        job: RefineJob,
        started: DateTime<Utc>,
    ) -> Result<StageOutcome, WorkerError> {
        let stage = self.stage();
        info!("Processing refine task");

        let stored = self.store.get_scraping_result(&job.scraping_result_id).await?;
        let outcome = self.refinement.refine(&stored.data).await;
        if !outcome.is_success() {
            record_refine_failure(stage.name());
        }

        let update = ScrapingResultUpdate {
            id: stored.id.unwrap_or_else(|| job.scraping_result_id.clone()),
            source_url: stored.source_url,
            data: outcome.data,
            progress: outcome.progress,
            status: outcome.status,
            target_id: stored.target_id,
            last_updated: Utc::now(),
            scraped_at: stored.scraped_at,
            error: outcome.error,
        };
        self.store.update_scraping_result(&update).await?;

        let agent_update = AgentStatusUpdate {
            id: job.agent_status_id,
            agent_name: stage.agent(),
            status: outcome.agent_state,
            start_time: job.start_time.unwrap_or_else(|| started.to_rfc3339()),
            end_time: Utc::now(),
            scraping_result_id: job.scraping_result_id,
        };
        self.store.update_agent_status(&agent_update).await?;

        info!(status = ?update.status, progress = update.progress, "Refine task finished");
        Ok(StageOutcome::Completed {
            scraping_result_id: update.id,
            status: update.status,
        })
    }
}

#[async_trait]
impl Worker for RefineWorker {
    async fn run_once(&self) -> Result<StageOutcome, WorkerError> {
        let Some(_guard) = self.lock.guard()? else {
            info!(stage = self.stage().name(), "Another stage is running, skipping run");
            return Ok(StageOutcome::LockBusy);
        };

        let started = Utc::now();
        match self.next_job().await? {
            Some(job) => self.process_job(job, started).await,
            None => {
                info!(stage = self.stage().name(), "No queued records");
                Ok(StageOutcome::Idle)
            }
        }
    }

    fn name(&self) -> &'static str {
        self.stage().name()
    }
}
