// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 页面元数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
}

/// 渲染后的页面
///
/// 同一个 HTML 页面的三种 Markdown 形式：原始、带引用编号、去除页眉页脚等噪声的精简版。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPage {
    pub url: String,
    pub raw_markdown: String,
    pub cited_markdown: String,
    pub fit_markdown: String,
    pub metadata: PageMetadata,
}

impl RenderedPage {
    /// 按存储时使用的名称列出各渲染结果
    pub fn renderings(&self) -> [(&'static str, &str); 3] {
        [
            ("fit_markdown", self.fit_markdown.as_str()),
            ("markdown_with_citation", self.cited_markdown.as_str()),
            ("raw_markdown", self.raw_markdown.as_str()),
        ]
    }
}
