// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::fmt;

use super::listing::{FeatureSet, ListingRecord};

/// 送入 LLM 的扁平文本字段
///
/// 每个变体对应 `ListingRecord` 中的一个路径，读写都通过穷尽匹配完成，
/// 新增字段时编译器会强制补全两个方向的映射。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    AddressCountry,
    AddressRegion,
    AddressCity,
    AddressDistrict,
    ListingTitle,
    ListingDescription,
    ListingPrice,
    ListingCurrency,
    ListingStatus,
    ListingType,
    ListingCategory,
    ContactFirstName,
    ContactLastName,
    ContactPhone,
    ContactEmail,
    ContactCompany,
    Features,
}

impl TextField {
    pub const ALL: [TextField; 17] = [
        TextField::AddressCountry,
        TextField::AddressRegion,
        TextField::AddressCity,
        TextField::AddressDistrict,
        TextField::ListingTitle,
        TextField::ListingDescription,
        TextField::ListingPrice,
        TextField::ListingCurrency,
        TextField::ListingStatus,
        TextField::ListingType,
        TextField::ListingCategory,
        TextField::ContactFirstName,
        TextField::ContactLastName,
        TextField::ContactPhone,
        TextField::ContactEmail,
        TextField::ContactCompany,
        TextField::Features,
    ];

    /// 扁平键名
    pub fn key(self) -> &'static str {
        match self {
            TextField::AddressCountry => "address_country",
            TextField::AddressRegion => "address_region",
            TextField::AddressCity => "address_city",
            TextField::AddressDistrict => "address_district",
            TextField::ListingTitle => "listing_title",
            TextField::ListingDescription => "listing_description",
            TextField::ListingPrice => "listing_price",
            TextField::ListingCurrency => "listing_currency",
            TextField::ListingStatus => "listing_status",
            TextField::ListingType => "listing_type",
            TextField::ListingCategory => "listing_category",
            TextField::ContactFirstName => "contact_first_name",
            TextField::ContactLastName => "contact_last_name",
            TextField::ContactPhone => "contact_phone",
            TextField::ContactEmail => "contact_email",
            TextField::ContactCompany => "contact_company",
            TextField::Features => "features",
        }
    }

    /// 标量字段的只读引用，`Features` 返回 None
    pub fn scalar(self, record: &ListingRecord) -> Option<&Option<String>> {
        match self {
            TextField::AddressCountry => Some(&record.address.country),
            TextField::AddressRegion => Some(&record.address.region),
            TextField::AddressCity => Some(&record.address.city),
            TextField::AddressDistrict => Some(&record.address.district),
            TextField::ListingTitle => Some(&record.listing.title),
            TextField::ListingDescription => Some(&record.listing.description),
            TextField::ListingPrice => Some(&record.listing.price),
            TextField::ListingCurrency => Some(&record.listing.currency),
            TextField::ListingStatus => Some(&record.listing.status),
            TextField::ListingType => Some(&record.listing.listing_type),
            TextField::ListingCategory => Some(&record.listing.category),
            TextField::ContactFirstName => Some(&record.contact.first_name),
            TextField::ContactLastName => Some(&record.contact.last_name),
            TextField::ContactPhone => Some(&record.contact.phone_number),
            TextField::ContactEmail => Some(&record.contact.email_address),
            TextField::ContactCompany => Some(&record.contact.company),
            TextField::Features => None,
        }
    }

    /// 标量字段的可变引用，`Features` 返回 None
    pub fn scalar_mut(self, record: &mut ListingRecord) -> Option<&mut Option<String>> {
        match self {
            TextField::AddressCountry => Some(&mut record.address.country),
            TextField::AddressRegion => Some(&mut record.address.region),
            TextField::AddressCity => Some(&mut record.address.city),
            TextField::AddressDistrict => Some(&mut record.address.district),
            TextField::ListingTitle => Some(&mut record.listing.title),
            TextField::ListingDescription => Some(&mut record.listing.description),
            TextField::ListingPrice => Some(&mut record.listing.price),
            TextField::ListingCurrency => Some(&mut record.listing.currency),
            TextField::ListingStatus => Some(&mut record.listing.status),
            TextField::ListingType => Some(&mut record.listing.listing_type),
            TextField::ListingCategory => Some(&mut record.listing.category),
            TextField::ContactFirstName => Some(&mut record.contact.first_name),
            TextField::ContactLastName => Some(&mut record.contact.last_name),
            TextField::ContactPhone => Some(&mut record.contact.phone_number),
            TextField::ContactEmail => Some(&mut record.contact.email_address),
            TextField::ContactCompany => Some(&mut record.contact.company),
            TextField::Features => None,
        }
    }

    /// 读取字段的文本形式，缺失值为空字符串，特性序列化为 JSON 文本
    pub fn read(self, record: &ListingRecord) -> String {
        match self.scalar(record) {
            Some(value) => value.clone().unwrap_or_default(),
            None => features_to_text(&record.features),
        }
    }
}

impl fmt::Display for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

fn features_to_text(features: &FeatureSet) -> String {
    serde_json::to_string(features).unwrap_or_else(|_| "[]".to_string())
}
