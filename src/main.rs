// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use listing_pipeline::config::settings::Settings;
use listing_pipeline::domain::models::task::{PipelineTask, QueueName};
use listing_pipeline::infrastructure::metrics;
use listing_pipeline::queue::task_queue::TaskQueue;
use listing_pipeline::utils::telemetry;
use listing_pipeline::workers::manager::{run_lock, task_queue, WorkerManager};
use listing_pipeline::workers::Worker;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Real-estate listing extraction and refinement pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scraping stage once
    Scrape,
    /// Run the cleaning stage once
    Clean,
    /// Run the enhancement stage once
    Enhance,
    /// Run all stages every poll interval until Ctrl-C
    Run,
    /// Add a page to the scraping queue
    Enqueue {
        /// Listing page URL
        #[arg(long)]
        url: String,
        /// Target the page belongs to
        #[arg(long)]
        target_id: String,
    },
    /// Add a stored result to the cleaning or extracting queue
    EnqueueRefine {
        /// `cleaning` or `extracting`
        #[arg(long)]
        queue: QueueName,
        #[arg(long)]
        scraping_result_id: String,
        /// Agent status row to update when the stage finishes
        #[arg(long)]
        agent_id: String,
    },
    /// Reset every queue to empty
    Clear,
    /// Remove the run lock marker left behind by a crashed run
    Unlock,
}

/// 主函数
///
/// 每个子命令对应一次阶段运行或一次队列维护操作
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_telemetry();

    let cli = Cli::parse();
    let settings = Settings::new().context("failed to load configuration")?;

    match cli.command {
        Command::Scrape => {
            let manager = WorkerManager::from_settings(settings)?;
            run_once(&manager.scrape_worker()).await?;
        }
        Command::Clean => {
            let manager = WorkerManager::from_settings(settings)?;
            run_once(&manager.cleaning_worker()).await?;
        }
        Command::Enhance => {
            let manager = WorkerManager::from_settings(settings)?;
            run_once(&manager.enhancement_worker()).await?;
        }
        Command::Run => {
            if settings.metrics.enabled {
                metrics::init_metrics(&settings.metrics.listen_addr);
            }
            let manager = WorkerManager::from_settings(settings)?;
            Arc::new(manager.scheduler()).run_until_shutdown().await;
        }
        Command::Enqueue { url, target_id } => {
            let queue = task_queue(&settings);
            queue
                .enqueue(QueueName::Scraping, PipelineTask::scrape(&url, &target_id))
                .await?;
            info!(url = %url, target_id = %target_id, "Scrape task enqueued");
        }
        Command::EnqueueRefine {
            queue,
            scraping_result_id,
            agent_id,
        } => {
            if queue == QueueName::Scraping {
                bail!("refine tasks go to the cleaning or extracting queue");
            }
            task_queue(&settings)
                .enqueue(queue, PipelineTask::refine(&scraping_result_id, &agent_id))
                .await?;
            info!(queue = %queue, scraping_result_id = %scraping_result_id, "Refine task enqueued");
        }
        Command::Clear => {
            task_queue(&settings).clear().await?;
            info!("All queues cleared");
        }
        Command::Unlock => {
            let lock = run_lock(&settings);
            match lock.holder() {
                Some(holder) => {
                    lock.release()?;
                    info!(holder = %holder, "Run lock removed");
                }
                None => info!("Run lock is not held"),
            }
        }
    }

    Ok(())
}

async fn run_once(worker: &dyn Worker) -> anyhow::Result<()> {
    let outcome = worker
        .run_once()
        .await
        .with_context(|| format!("{} stage failed", worker.name()))?;
    metrics::record_stage_run(worker.name(), outcome.label());
    info!(stage = worker.name(), outcome = ?outcome, "Stage run finished");
    Ok(())
}
