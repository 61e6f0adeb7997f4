// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::settings::Settings;
use crate::domain::repositories::listing_store::ListingStore;
use crate::domain::repositories::storage_repository::StorageRepository;
use crate::domain::services::extraction_service::ExtractionService;
use crate::domain::services::llm_service::{LLMService, LLMServiceTrait};
use crate::domain::services::refinement::{RefinePolicy, RefinementService};
use crate::engines::reqwest_engine::ReqwestEngine;
use crate::engines::traits::ScraperEngine;
use crate::infrastructure::remote_store::HttpListingStore;
use crate::infrastructure::storage::create_storage_repository;
use crate::queue::run_lock::RunLock;
use crate::queue::scheduler::StageScheduler;
use crate::queue::task_queue::{FileTaskQueue, TaskQueue};
use crate::utils::errors::WorkerError;
use crate::workers::refine_worker::RefineWorker;
use crate::workers::scrape_worker::ScrapeWorker;
use crate::workers::worker::Worker;

/// 工作管理器
///
/// 持有各阶段共享的依赖，按需构造阶段工作器和调度器
pub struct WorkerManager {
    settings: Settings,
    queue: Arc<dyn TaskQueue>,
    lock: RunLock,
    store: Arc<dyn ListingStore>,
    llm: Arc<dyn LLMServiceTrait>,
    storage: Arc<dyn StorageRepository>,
    engine: Arc<dyn ScraperEngine>,
}

impl WorkerManager {
    pub fn new(
        settings: Settings,
        queue: Arc<dyn TaskQueue>,
        store: Arc<dyn ListingStore>,
        llm: Arc<dyn LLMServiceTrait>,
        storage: Arc<dyn StorageRepository>,
        engine: Arc<dyn ScraperEngine>,
    ) -> Self {
        let lock = run_lock(&settings);
        Self {
            settings,
            queue,
            lock,
            store,
            llm,
            storage,
            engine,
        }
    }

    /// 根据配置构造全部真实依赖
    pub fn from_settings(settings: Settings) -> Result<Self, WorkerError> {
        let queue: Arc<dyn TaskQueue> = Arc::new(task_queue(&settings));
        let store: Arc<dyn ListingStore> = Arc::new(HttpListingStore::new(&settings.remote_api)?);
        let llm: Arc<dyn LLMServiceTrait> = Arc::new(LLMService::new(&settings.llm)?);
        let storage = create_storage_repository(&settings.storage)?;
        let engine: Arc<dyn ScraperEngine> = Arc::new(ReqwestEngine::new(&settings.scraper)?);

        info!(
            queue = %settings.queue.path,
            lock = %settings.lock.path,
            remote = %settings.remote_api.base_url,
            "Pipeline components initialized"
        );
        Ok(Self::new(settings, queue, store, llm, storage, engine))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn queue(&self) -> Arc<dyn TaskQueue> {
        self.queue.clone()
    }

    pub fn lock(&self) -> &RunLock {
        &self.lock
    }

    pub fn scrape_worker(&self) -> ScrapeWorker {
        let extraction =
            ExtractionService::new(self.llm.clone(), self.storage.clone(), &self.settings);
        ScrapeWorker::new(
            self.queue.clone(),
            self.lock.clone(),
            self.engine.clone(),
            Arc::new(extraction),
            self.store.clone(),
            Duration::from_secs(self.settings.scraper.timeout_secs),
        )
    }

    pub fn cleaning_worker(&self) -> RefineWorker {
        self.refine_worker(RefinePolicy::cleaning(&self.settings))
    }

    pub fn enhancement_worker(&self) -> RefineWorker {
        self.refine_worker(RefinePolicy::enhancement(&self.settings))
    }

    fn refine_worker(&self, policy: RefinePolicy) -> RefineWorker {
        RefineWorker::new(
            self.queue.clone(),
            self.lock.clone(),
            self.store.clone(),
            RefinementService::new(self.llm.clone(), policy),
        )
    }

    /// 依次运行抓取、清洗、增强三个阶段的调度器
    pub fn scheduler(&self) -> StageScheduler {
        let stages: Vec<Arc<dyn Worker>> = vec![
            Arc::new(self.scrape_worker()) as Arc<dyn Worker>,
            Arc::new(self.cleaning_worker()),
            Arc::new(self.enhancement_worker()),
        ];
        StageScheduler::new(
            stages,
            Duration::from_secs(self.settings.pipeline.poll_interval_secs),
        )
    }
}

/// 按配置构造任务队列，不依赖远程服务
pub fn task_queue(settings: &Settings) -> FileTaskQueue {
    FileTaskQueue::new(&settings.queue.path)
}

/// 按配置构造运行锁
pub fn run_lock(settings: &Settings) -> RunLock {
    RunLock::new(&settings.lock.path)
        .with_stale_after(settings.lock.stale_after_secs.map(Duration::from_secs))
}
