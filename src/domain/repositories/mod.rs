// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 领域层只依赖这些特质，具体实现位于基础设施层：
/// - 房源存储（listing_store）：远程房源管理系统的读写
/// - 存储仓库（storage_repository）：渲染结果等文件的保存
pub mod listing_store;
pub mod storage_repository;
