// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod mock_llm;
pub mod mock_store;

use listing_pipeline::config::settings::Settings;
use listing_pipeline::domain::repositories::storage_repository::StorageRepository;
use listing_pipeline::domain::services::llm_service::LLMServiceTrait;
use listing_pipeline::engines::reqwest_engine::ReqwestEngine;
use listing_pipeline::engines::traits::ScraperEngine;
use listing_pipeline::infrastructure::storage::InMemoryStorage;
use listing_pipeline::queue::task_queue::TaskQueue;
use listing_pipeline::workers::manager::{task_queue, WorkerManager};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use self::mock_llm::ScriptedLlm;
use self::mock_store::InMemoryListingStore;

/// 一次测试所需的全部组件
pub struct TestPipeline {
    pub manager: WorkerManager,
    pub store: Arc<InMemoryListingStore>,
    pub llm: Arc<ScriptedLlm>,
    pub storage: InMemoryStorage,
    pub queue: Arc<dyn TaskQueue>,
    // 保持临时目录存活
    pub dir: TempDir,
}

/// 队列与锁文件放在临时目录中的默认配置
pub fn test_settings(dir: &TempDir) -> Settings {
    let mut settings: Settings = Settings::defaults()
        .unwrap()
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();
    settings.queue.path = dir.path().join("queue.json").display().to_string();
    settings.lock.path = dir.path().join("processing.lock").display().to_string();
    settings.storage.storage_type = "memory".to_string();
    settings
}

pub fn create_pipeline(llm_replies: &[&str]) -> TestPipeline {
    let dir = TempDir::new().unwrap();
    create_pipeline_with(test_settings(&dir), dir, llm_replies)
}

pub fn create_pipeline_with(settings: Settings, dir: TempDir, llm_replies: &[&str]) -> TestPipeline {
    let queue: Arc<dyn TaskQueue> = Arc::new(task_queue(&settings));
    let store = Arc::new(InMemoryListingStore::default());
    let llm = ScriptedLlm::new(llm_replies);
    let storage = InMemoryStorage::new();
    let engine: Arc<dyn ScraperEngine> = Arc::new(ReqwestEngine::new(&settings.scraper).unwrap());

    let manager = WorkerManager::new(
        settings,
        queue.clone(),
        store.clone(),
        llm.clone() as Arc<dyn LLMServiceTrait>,
        Arc::new(storage.clone()) as Arc<dyn StorageRepository>,
        engine,
    );

    TestPipeline {
        manager,
        store,
        llm,
        storage,
        queue,
        dir,
    }
}

/// 带有单个一级标题的房源详情页
pub fn listing_page_html() -> String {
    r#"<html>
<head>
  <title>Sunny flat in Malaga</title>
  <meta property="og:title" content="Sunny flat with sea views">
</head>
<body>
  <nav><a href="/">Home</a></nav>
  <h1>Sunny flat</h1>
  <p>Bright two bedroom flat close to the beach.</p>
  <p>Price: 250000 EUR</p>
  <img src="/img/front.jpg" alt="Front">
  <footer>Contact us</footer>
</body>
</html>"#
        .to_string()
}

/// 包含全部必填字段的抽取结果
pub fn extracted_listing() -> Value {
    json!({
        "address": {"country": "Spain", "region": "Andalusia", "city": "Malaga", "district": "Centro"},
        "property": {"lat": "36.72", "lng": "-4.42"},
        "listing": {
            "listing_title": "Sunny flat",
            "description": "Bright two bedroom flat",
            "price": "250000",
            "currency": "EUR",
            "status": "available",
            "listing_type": "sale",
            "category": "apartment"
        },
        "features": [{"feature": "Bedrooms", "value": "2"}],
        "files": ["https://listings.example/img/front.jpg"],
        "contact": {"first_name": "Ana", "phone_number": "+34 600 000 000"}
    })
}

/// 远程存储中一条待精炼的记录
pub fn stored_listing() -> Value {
    json!({
        "address": {"country": "España", "region": "Andalucía", "city": "Málaga", "district": "Centro"},
        "property": {"lat": "36.72", "lng": "-4.42"},
        "listing": {
            "listing_title": "Cassa luminosa",
            "description": "Piso luminoso",
            "price": "250000",
            "currency": "EUR",
            "status": "disponible",
            "listing_type": "venta",
            "category": "piso"
        },
        "features": [{"feature": "Dormitorios", "value": "2"}],
        "files": ["https://img/1.jpg", "https://img/2.jpg", "https://img/3.jpg"],
        "contact": {
            "first_name": "Ana",
            "last_name": "Ruiz",
            "phone_number": "+34 600 000 000",
            "email_address": "ana@example.com",
            "company": "Inmo"
        },
        "amenities": [{"amenity": "Piscina"}]
    })
}

/// 清洗/增强阶段的 LLM 输出
pub fn refined_fields() -> String {
    json!({
        "address_country": "Spain",
        "address_region": "Andalusia",
        "address_city": "Malaga",
        "address_district": "Centre",
        "listing_title": "Bright house",
        "listing_description": "Bright flat",
        "listing_price": "250000",
        "listing_currency": "EUR",
        "listing_status": "available",
        "listing_type": "sale",
        "listing_category": "flat",
        "contact_first_name": "Ana",
        "contact_last_name": "Ruiz",
        "contact_phone": "+34 600 000 000",
        "contact_email": "",
        "contact_company": "Inmo",
        "features": "[{\"feature\": \"Bedrooms\", \"value\": \"2\"}]"
    })
    .to_string()
}
