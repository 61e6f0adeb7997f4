// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了流水线的核心数据结构，包括：
/// - 房源记录（listing）：抽取、清洗、增强阶段之间传递的规范化数据
/// - 扁平文本字段（text_field）：送入 LLM 的字段与记录路径的映射表
/// - 队列任务（task）：抓取任务与清洗/增强任务
/// - 代理状态（agent_status）与抓取结果（scraping_result）：远程存储的传输格式
/// - 渲染页面（page）：抓取后的 Markdown 与元数据
pub mod agent_status;
pub mod lenient;
pub mod listing;
pub mod page;
pub mod scraping_result;
pub mod task;
pub mod text_field;
