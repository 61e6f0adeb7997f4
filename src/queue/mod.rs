// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 文件任务队列、单实例运行锁和阶段调度
pub mod run_lock;
pub mod scheduler;
pub mod task_queue;

