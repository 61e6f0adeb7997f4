// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::lenient::{optional_string, string_or_empty};

/// 地址信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, JsonSchema)]
pub struct Address {
    /// 国家
    #[serde(default, deserialize_with = "optional_string")]
    #[validate(required, length(min = 1))]
    pub country: Option<String>,
    /// 地区/省份
    #[serde(default, deserialize_with = "optional_string")]
    #[validate(required, length(min = 1))]
    pub region: Option<String>,
    /// 城市
    #[serde(default, deserialize_with = "optional_string")]
    #[validate(required, length(min = 1))]
    pub city: Option<String>,
    /// 区县
    #[serde(default, deserialize_with = "optional_string")]
    #[validate(required, length(min = 1))]
    pub district: Option<String>,
}

/// 房产坐标
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PropertyCoords {
    #[serde(default, deserialize_with = "optional_string")]
    pub lat: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    pub lng: Option<String>,
}

/// 房源主体信息
///
/// `title` 在传输格式中名为 `listing_title`，读取时也接受 `title`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, JsonSchema)]
pub struct ListingInfo {
    #[serde(
        rename = "listing_title",
        alias = "title",
        default,
        deserialize_with = "optional_string"
    )]
    #[validate(required, length(min = 1))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    #[validate(required, length(min = 1))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    #[validate(required, length(min = 1))]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    #[validate(required, length(min = 1))]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    #[validate(required, length(min = 1))]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    #[validate(required, length(min = 1))]
    pub listing_type: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    #[validate(required, length(min = 1))]
    pub category: Option<String>,
}

/// 联系人信息，电话为必填
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, JsonSchema)]
pub struct Contact {
    #[serde(default, deserialize_with = "optional_string")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    #[validate(required, length(min = 1))]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    pub email_address: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    pub company: Option<String>,
}

/// 单个房产特性，例如 `{"feature": "Bedrooms", "value": "3"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Feature {
    pub feature: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub value: String,
}

impl Feature {
    pub fn new(feature: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            value: value.into(),
        }
    }
}

/// 按 `feature` 去重的有序特性集合，先出现者保留
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Feature>", into = "Vec<Feature>")]
pub struct FeatureSet(Vec<Feature>);

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入特性，键已存在时忽略并返回 false
    pub fn insert(&mut self, feature: Feature) -> bool {
        if self.contains(&feature.feature) {
            return false;
        }
        self.0.push(feature);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|f| f.feature == key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|f| f.feature == key)
            .map(|f| f.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Feature>> for FeatureSet {
    fn from(features: Vec<Feature>) -> Self {
        let mut set = FeatureSet::new();
        for feature in features {
            set.insert(feature);
        }
        set
    }
}

impl From<FeatureSet> for Vec<Feature> {
    fn from(set: FeatureSet) -> Self {
        set.0
    }
}

/// 文件 URL 集合
///
/// 插入时去除全部空白字符并去重，保留首次出现的顺序。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FileSet(Vec<String>);

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str) -> bool {
        let normalized: String = url.chars().filter(|c| !c.is_whitespace()).collect();
        if normalized.is_empty() || self.0.contains(&normalized) {
            return false;
        }
        self.0.push(normalized);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.iter().any(|u| u == url)
    }

    /// 只保留前 `limit` 个文件
    pub fn truncate(&mut self, limit: usize) {
        self.0.truncate(limit);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for FileSet {
    fn from(urls: Vec<String>) -> Self {
        let mut set = FileSet::new();
        for url in &urls {
            set.insert(url);
        }
        set
    }
}

impl From<FileSet> for Vec<String> {
    fn from(set: FileSet) -> Self {
        set.0
    }
}

/// 房源记录
///
/// 抽取、清洗、增强三个阶段之间传递的规范化数据结构。
/// 严格校验规则通过 `validator` 声明；入库前的最低要求见
/// [`ListingRecord::has_mandatory_fields`]。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, JsonSchema)]
pub struct ListingRecord {
    #[serde(default)]
    #[validate(nested)]
    pub address: Address,
    #[serde(default)]
    pub property: PropertyCoords,
    #[serde(default)]
    #[validate(nested)]
    pub listing: ListingInfo,
    #[serde(default)]
    #[schemars(with = "Vec<Feature>")]
    pub features: FeatureSet,
    #[serde(default)]
    #[schemars(with = "Vec<String>")]
    pub files: FileSet,
    #[serde(default)]
    #[validate(nested)]
    pub contact: Contact,
    /// 旧格式中独立存放的设施列表，清洗成功后移除
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub amenities: Option<Value>,
}

fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl ListingRecord {
    /// 标题、价格、至少一个文件
    pub fn has_mandatory_fields(&self) -> bool {
        is_present(&self.listing.title) && is_present(&self.listing.price) && !self.files.is_empty()
    }

    /// 清洗/增强阶段需要把记录作为原始 JSON 回写
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
