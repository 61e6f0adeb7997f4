// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 提取服务（extraction_service）：页面检查、分块抽取与记录校验
/// - 合并器（listing_merger）：合并分块抽取结果
/// - LLM服务（llm_service）：与 OpenAI 兼容接口交互
/// - 精炼服务（refinement）：清洗与增强阶段的文本改写
pub mod extraction_service;
pub mod listing_merger;
pub mod llm_service;
pub mod refinement;
