// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::infrastructure::metrics::record_stage_run;
use crate::workers::worker::{StageOutcome, Worker};

/// 阶段调度器
///
/// 按固定间隔依次运行各阶段。阶段之间靠运行锁互斥，
/// 单次运行失败只记录日志，不会中断调度循环。
pub struct StageScheduler {
    /// 按执行顺序排列的阶段
    stages: Vec<Arc<dyn Worker>>,
    /// 调度间隔
    period: Duration,
}

impl StageScheduler {
    /// 创建新的调度器
    ///
    /// # 参数
    ///
    /// * `stages` - 每个周期依次运行的阶段
    /// * `period` - 两次周期之间的间隔
    pub fn new(stages: Vec<Arc<dyn Worker>>, period: Duration) -> Self {
        Self { stages, period }
    }

    /// 运行单个阶段并记录结果
    ///
    /// # 返回值
    ///
    /// 运行成功时返回阶段结果，失败时返回 `None`
    pub async fn run_stage(stage: &dyn Worker) -> Option<StageOutcome> {
        match stage.run_once().await {
            Ok(outcome) => {
                record_stage_run(stage.name(), outcome.label());
                info!(stage = stage.name(), outcome = outcome.label(), "Stage run finished");
                Some(outcome)
            }
            Err(e) => {
                record_stage_run(stage.name(), "error");
                error!(stage = stage.name(), "Stage run failed: {}", e);
                None
            }
        }
    }

    /// 运行一个完整周期
    pub async fn tick(&self) -> Vec<Option<StageOutcome>> {
        let mut outcomes = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            outcomes.push(Self::run_stage(stage.as_ref()).await);
        }
        outcomes
    }

    /// 启动调度器后台任务
    ///
    /// 关闭信号只在两个周期之间生效，正在运行的周期总会跑完，
    /// 阶段不会在持有运行锁时被中途取消。
    ///
    /// # 参数
    ///
    /// * `shutdown` - 值变为 `true`（或发送端被丢弃）时停止调度
    ///
    /// # 返回值
    ///
    /// 返回后台任务的句柄
    pub fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {}
                }
                self.tick().await;
            }
            info!("Scheduler loop exited");
        })
    }

    /// 运行调度循环直到收到 Ctrl-C
    ///
    /// 收到信号后等待当前周期结束再返回。
    pub async fn run_until_shutdown(self: Arc<Self>) {
        info!(
            stages = self.stages.len(),
            period_secs = self.period.as_secs(),
            "Scheduler started"
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = self.start(shutdown_rx);

        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, waiting for running stage"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }

        let _ = shutdown_tx.send(true);
        if let Err(err) = handle.await {
            error!("Scheduler task failed: {}", err);
        }
        info!("Scheduler stopped");
    }
}
