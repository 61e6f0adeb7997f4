// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// 存储错误
    #[error("Storage error: {0}")]
    Other(String),
}

/// 存储仓库特质
///
/// 保存抓取页面的 Markdown 渲染结果，键形如 `markdown_<target_id>/<kind>_<safe_url>.md`
#[async_trait]
pub trait StorageRepository: Send + Sync {
    /// 使用指定键保存数据，已存在时覆盖
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// 根据键读取数据
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// 列出以 `prefix` 开头的所有键，按字典序排列
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}
