// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 每个流水线阶段对应一个工作器，单次运行处理至多一个任务
pub mod manager;
pub mod refine_worker;
pub mod scrape_worker;
pub mod worker;

pub use worker::{StageOutcome, Worker};
