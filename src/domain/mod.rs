// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// - 领域模型（models）：房源记录、任务与状态
/// - 仓库接口（repositories）：远程存储与文件存储抽象
/// - 服务（services）：抽取、合并与精炼
pub mod models;
pub mod repositories;
pub mod services;
