// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::models::lenient::scalar_to_string;
use crate::domain::models::listing::{
    Address, Contact, Feature, ListingInfo, ListingRecord, PropertyCoords,
};

/// 未提供值的设施默认取值
const AMENITY_DEFAULT_VALUE: &str = "Yes";

/// 分块合并错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("第 {index} 个分块不是 JSON 对象")]
    NotAnObject { index: usize },

    #[error("第 {index} 个分块中的特性条目缺少 feature 字段")]
    MalformedFeature { index: usize },

    #[error("第 {index} 个分块中的设施条目缺少 amenity 字段")]
    MalformedAmenity { index: usize },
}

/// 房源数据合并器
///
/// 将 LLM 分块抽取得到的多个部分结果合并为一条房源记录：
/// - 标量字段：先到先得，只填充仍为空的槽位
/// - 特性：按 `feature` 去重，旧格式的 `amenities` 转换为特性
/// - 文件：去除空白后求并集
pub struct ListingMerger;

impl ListingMerger {
    /// 按顺序合并所有分块
    pub fn merge(chunks: &[Value]) -> Result<ListingRecord, MergeError> {
        let mut merged = ListingRecord::default();
        for (index, chunk) in chunks.iter().enumerate() {
            let object = chunk.as_object().ok_or(MergeError::NotAnObject { index })?;
            Self::merge_chunk(&mut merged, object, index)?;
        }
        Ok(merged)
    }

    fn merge_chunk(
        merged: &mut ListingRecord,
        chunk: &Map<String, Value>,
        index: usize,
    ) -> Result<(), MergeError> {
        if let Some(section) = section(chunk, "address") {
            merge_address(&mut merged.address, section);
        }
        if let Some(section) = section(chunk, "property") {
            merge_property(&mut merged.property, section);
        }
        if let Some(section) = section(chunk, "listing") {
            merge_listing(&mut merged.listing, section);
        }
        if let Some(section) = section(chunk, "contact") {
            merge_contact(&mut merged.contact, section);
        }

        if let Some(features) = chunk.get("features").and_then(Value::as_array) {
            for entry in features {
                let key = entry
                    .get("feature")
                    .and_then(scalar_to_string)
                    .ok_or(MergeError::MalformedFeature { index })?;
                let value = entry.get("value").and_then(scalar_to_string).unwrap_or_default();
                merged.features.insert(Feature::new(key, value));
            }
        }

        if let Some(amenities) = chunk.get("amenities").and_then(Value::as_array) {
            for entry in amenities {
                let key = entry
                    .get("amenity")
                    .and_then(scalar_to_string)
                    .ok_or(MergeError::MalformedAmenity { index })?;
                let value = match entry.get("value") {
                    None | Some(Value::Null) => AMENITY_DEFAULT_VALUE.to_string(),
                    Some(other) => scalar_to_string(other).unwrap_or_default(),
                };
                merged.features.insert(Feature::new(key, value));
            }
        }

        if let Some(files) = chunk.get("files").and_then(Value::as_array) {
            for url in files.iter().filter_map(Value::as_str) {
                merged.files.insert(url);
            }
        }

        Ok(())
    }
}

fn section<'a>(chunk: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    chunk.get(key).and_then(Value::as_object)
}

/// 槽位为空且候选值非空时才写入
fn fill_first(slot: &mut Option<String>, candidate: Option<&Value>) {
    if slot.as_deref().is_some_and(|v| !v.trim().is_empty()) {
        return;
    }
    if let Some(value) = candidate
        .and_then(scalar_to_string)
        .filter(|v| !v.trim().is_empty())
    {
        *slot = Some(value);
    }
}

fn merge_address(target: &mut Address, section: &Map<String, Value>) {
    fill_first(&mut target.country, section.get("country"));
    fill_first(&mut target.region, section.get("region"));
    fill_first(&mut target.city, section.get("city"));
    fill_first(&mut target.district, section.get("district"));
}

fn merge_property(target: &mut PropertyCoords, section: &Map<String, Value>) {
    fill_first(&mut target.lat, section.get("lat"));
    fill_first(&mut target.lng, section.get("lng"));
}

fn merge_listing(target: &mut ListingInfo, section: &Map<String, Value>) {
    let title = section.get("listing_title").or_else(|| section.get("title"));
    fill_first(&mut target.title, title);
    fill_first(&mut target.description, section.get("description"));
    fill_first(&mut target.price, section.get("price"));
    fill_first(&mut target.currency, section.get("currency"));
    fill_first(&mut target.status, section.get("status"));
    fill_first(&mut target.listing_type, section.get("listing_type"));
    fill_first(&mut target.category, section.get("category"));
}

fn merge_contact(target: &mut Contact, section: &Map<String, Value>) {
    fill_first(&mut target.first_name, section.get("first_name"));
    fill_first(&mut target.last_name, section.get("last_name"));
    fill_first(&mut target.phone_number, section.get("phone_number"));
    fill_first(&mut target.email_address, section.get("email_address"));
    fill_first(&mut target.company, section.get("company"));
}

#[cfg(test)]
#[path = "listing_merger_test.rs"]
mod tests;
