// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! HTML 到 Markdown 的渲染
//!
//! 为抽取阶段生成同一页面的三种 Markdown：
//! - 原始版本：保留全部正文与链接
//! - 引用版本：链接替换为 `⟨n⟩` 编号，文末附引用列表
//! - 精简版本：去掉导航、页眉页脚、侧栏和表单
//!
//! 先用 `scraper` 裁剪 DOM，再交给 `htmd` 转换，最后统一处理链接地址。

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{ElementRef, Html};
use tracing::warn;
use url::Url;

use crate::domain::models::page::{PageMetadata, RenderedPage};
use crate::utils::url_utils::resolve_url;

/// 任何版本都不渲染的元素
const SKIPPED_TAGS: &[&str] = &["head", "script", "style", "noscript", "template", "svg", "iframe"];

/// 精简版本额外去掉的元素
const BOILERPLATE_TAGS: &[&str] = &["nav", "header", "footer", "aside", "form"];

/// Markdown 链接与图片：`[text](target "title")`
static MARKDOWN_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(!?)\[([^\]]*)\]\(\s*<?([^()\s<>]+)>?(?:\s+"[^"]*")?\s*\)"#)
        .expect("Failed to compile markdown link regex")
});

/// 渲染整个页面
pub fn render_page(url: &str, html: &str) -> RenderedPage {
    let document = Html::parse_document(html);
    let base = Url::parse(url).ok();

    let raw_markdown = resolve_links(&to_markdown(&prune(&document, SKIPPED_TAGS)), base.as_ref());
    let fit_tags: Vec<&str> = SKIPPED_TAGS.iter().chain(BOILERPLATE_TAGS).copied().collect();
    let fit_markdown = resolve_links(&to_markdown(&prune(&document, &fit_tags)), base.as_ref());

    RenderedPage {
        url: url.to_string(),
        cited_markdown: cite_links(&raw_markdown),
        raw_markdown,
        fit_markdown,
        metadata: extract_metadata(&document),
    }
}

/// 读取标题、描述与 Open Graph 元数据
pub fn extract_metadata(document: &Html) -> PageMetadata {
    let mut metadata = PageMetadata::default();

    for element in document.root_element().descendants().filter_map(ElementRef::wrap) {
        let el = element.value();
        match el.name() {
            "title" if metadata.title.is_none() => {
                metadata.title = non_empty(collapse_whitespace(&element.text().collect::<String>()));
            }
            "meta" => {
                let key = el.attr("property").or_else(|| el.attr("name"));
                let content = el.attr("content").map(collapse_whitespace).and_then(non_empty);
                let slot = match key.map(str::to_ascii_lowercase).as_deref() {
                    Some("description") => &mut metadata.description,
                    Some("og:title") => &mut metadata.og_title,
                    Some("og:description") => &mut metadata.og_description,
                    _ => continue,
                };
                if slot.is_none() {
                    *slot = content;
                }
            }
            _ => {}
        }
    }

    metadata
}

/// 统计顶级标题行数（以 `# ` 开头，不含 `##`）
pub fn count_top_level_headings(markdown: &str) -> usize {
    markdown
        .lines()
        .filter(|line| line.starts_with("# ") && !line.starts_with("##"))
        .count()
}

/// 按行切分为不超过 `max_chars` 个字符的分块
///
/// 单行超长时在字符边界硬切。
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for line in text.lines() {
        let line_chars = line.chars().count();

        if line_chars > max_chars {
            if !current.trim().is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current.clear();
            current_chars = 0;
            let chars: Vec<char> = line.chars().collect();
            chunks.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
            continue;
        }

        // 换行符也计入长度
        let needed = if current.is_empty() { line_chars } else { line_chars + 1 };
        if current_chars + needed > max_chars {
            if !current.trim().is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current.clear();
            current_chars = 0;
        }

        if !current.is_empty() {
            current.push('\n');
            current_chars += 1;
        }
        current.push_str(line);
        current_chars += line_chars;
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// 去掉指定元素（连同子树）后重新序列化为 HTML
fn prune(document: &Html, tags: &[&str]) -> String {
    let mut pruned = document.clone();
    let ids: Vec<_> = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| tags.contains(&element.value().name()))
        .map(|element| element.id())
        .collect();
    for id in ids {
        if let Some(mut node) = pruned.tree.get_mut(id) {
            node.detach();
        }
    }
    pruned.html()
}

fn to_markdown(html: &str) -> String {
    match htmd::convert(html) {
        Ok(markdown) => markdown.trim().to_string(),
        Err(err) => {
            warn!("Markdown conversion failed, falling back to plain text: {}", err);
            let document = Html::parse_document(html);
            collapse_whitespace(&document.root_element().text().collect::<String>())
        }
    }
}

/// 页内锚点和脚本链接不指向其他页面
fn is_navigable(target: &str) -> bool {
    !target.starts_with('#') && !target.starts_with("javascript:")
}

/// 把链接和图片地址补全为绝对 URL
fn resolve_links(markdown: &str, base: Option<&Url>) -> String {
    let Some(base) = base else {
        return markdown.to_string();
    };
    MARKDOWN_LINK
        .replace_all(markdown, |caps: &Captures| {
            let target = &caps[3];
            let resolved = if is_navigable(target) {
                resolve_url(base, target)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| target.to_string())
            } else {
                target.to_string()
            };
            format!("{}[{}]({})", &caps[1], &caps[2], resolved)
        })
        .into_owned()
}

/// 链接替换为 `文本⟨n⟩`，相同地址共用编号，文末附引用列表
fn cite_links(markdown: &str) -> String {
    let mut references: Vec<String> = Vec::new();
    let mut body = MARKDOWN_LINK
        .replace_all(markdown, |caps: &Captures| {
            if !caps[1].is_empty() {
                return caps[0].to_string();
            }
            let text = caps[2].trim();
            let href = &caps[3];
            if !is_navigable(href) {
                return text.to_string();
            }
            let index = match references.iter().position(|r| r == href) {
                Some(pos) => pos + 1,
                None => {
                    references.push(href.to_string());
                    references.len()
                }
            };
            format!("{}⟨{}⟩", text, index)
        })
        .into_owned();

    if !references.is_empty() {
        body.push_str("\n\n## References\n\n");
        let lines: Vec<String> = references
            .iter()
            .enumerate()
            .map(|(i, href)| format!("⟨{}⟩ {}", i + 1, href))
            .collect();
        body.push_str(&lines.join("\n"));
    }
    body
}
