// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraping_result::ResultStatus;
use crate::domain::services::extraction_service::RejectReason;
use crate::utils::errors::WorkerError;
use async_trait::async_trait;

/// 单次阶段运行的结果
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// 其他阶段持有运行锁，本次跳过
    LockBusy,
    /// 没有待处理任务
    Idle,
    /// 页面被拒绝，未写入远程存储
    Rejected { url: String, reason: RejectReason },
    /// 抓取结果已创建或更新
    Completed {
        scraping_result_id: String,
        status: ResultStatus,
    },
}

impl StageOutcome {
    /// 指标标签
    pub fn label(&self) -> &'static str {
        match self {
            StageOutcome::LockBusy => "lock_busy",
            StageOutcome::Idle => "idle",
            StageOutcome::Rejected { .. } => "rejected",
            StageOutcome::Completed {
                status: ResultStatus::Failed,
                ..
            } => "failed",
            StageOutcome::Completed { .. } => "completed",
        }
    }
}

/// Worker trait定义
///
/// 每个流水线阶段实现一次运行：获取锁、处理至多一个任务、释放锁
#[async_trait]
pub trait Worker: Send + Sync {
    /// 运行一次阶段
    async fn run_once(&self) -> Result<StageOutcome, WorkerError>;

    /// 获取工作器名称
    fn name(&self) -> &'static str;
}
