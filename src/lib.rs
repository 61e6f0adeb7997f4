// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 房源记录、抽取合并与精炼逻辑，以及存储接口
pub mod domain;

/// 引擎模块
///
/// 页面抓取引擎
pub mod engines;

/// 基础设施模块
///
/// 远程存储客户端、文件存储与指标
pub mod infrastructure;

/// 队列模块
///
/// 文件任务队列、运行锁与调度
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 各流水线阶段的单次运行
pub mod workers;
