// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_pipeline, extracted_listing, listing_page_html};
use listing_pipeline::domain::models::agent_status::{AgentName, AgentState};
use listing_pipeline::domain::models::scraping_result::ResultStatus;
use listing_pipeline::domain::models::task::{PipelineTask, QueueName};
use listing_pipeline::domain::repositories::storage_repository::StorageRepository;
use listing_pipeline::domain::services::extraction_service::RejectReason;
use listing_pipeline::queue::task_queue::TaskQueue;
use listing_pipeline::utils::errors::WorkerError;
use listing_pipeline::workers::{StageOutcome, Worker};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve_page(server: &MockServer, route: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("content-type", "text/html")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_accepted_page_is_posted_with_markers() {
    let server = MockServer::start().await;
    serve_page(&server, "/flat/1", 200, listing_page_html()).await;

    let reply = extracted_listing().to_string();
    let pipeline = create_pipeline(&[reply.as_str()]);
    let url = format!("{}/flat/1", server.uri());
    pipeline
        .queue
        .enqueue(QueueName::Scraping, PipelineTask::scrape(&url, "target-1"))
        .await
        .unwrap();

    let outcome = pipeline.manager.scrape_worker().run_once().await.unwrap();

    assert_eq!(
        outcome,
        StageOutcome::Completed {
            scraping_result_id: "result-1".to_string(),
            status: ResultStatus::InProgress,
        }
    );

    let created = pipeline.store.created();
    assert_eq!(created.len(), 1);
    let result = &created[0];
    assert_eq!(result.source_url, url);
    assert_eq!(result.target_id, "target-1");
    assert_eq!(result.progress, 33);
    assert_eq!(result.data.listing.title.as_deref(), Some("Sunny flat"));

    let markers: Vec<(AgentName, AgentState)> = result
        .agent_status
        .iter()
        .map(|entry| (entry.agent_name, entry.status))
        .collect();
    assert_eq!(
        markers,
        vec![
            (AgentName::Scraping, AgentState::Success),
            (AgentName::Cleaning, AgentState::Queued),
            (AgentName::Extracting, AgentState::Queued),
        ]
    );

    assert_eq!(pipeline.llm.calls(), 1);
    assert!(pipeline.queue.dequeue(QueueName::Scraping).await.unwrap().is_none());
    assert!(!pipeline.manager.lock().is_held());
}

#[tokio::test]
async fn test_renderings_saved_per_target() {
    let server = MockServer::start().await;
    serve_page(&server, "/flat/1", 200, listing_page_html()).await;

    let reply = extracted_listing().to_string();
    let pipeline = create_pipeline(&[reply.as_str()]);
    let url = format!("{}/flat/1", server.uri());
    pipeline
        .queue
        .enqueue(QueueName::Scraping, PipelineTask::scrape(&url, "target-1"))
        .await
        .unwrap();

    pipeline.manager.scrape_worker().run_once().await.unwrap();

    let keys = pipeline.storage.list("markdown_target-1/").await.unwrap();
    assert_eq!(keys.len(), 3);
    assert!(keys.iter().any(|k| k.starts_with("markdown_target-1/fit_markdown_")));
    assert!(keys.iter().any(|k| k.starts_with("markdown_target-1/raw_markdown_")));
    assert!(keys
        .iter()
        .any(|k| k.starts_with("markdown_target-1/markdown_with_citation_")));
    assert!(keys.iter().all(|k| k.ends_with(".md") && !k.contains(':')));
}

#[tokio::test]
async fn test_two_top_level_headings_rejected_without_llm_call() {
    let server = MockServer::start().await;
    let html = "<html><head><title>Flat</title></head><body>\
                <h1>First flat</h1><p>One</p><h1>Second flat</h1><p>Two</p>\
                </body></html>";
    serve_page(&server, "/flat/2", 200, html.to_string()).await;

    let reply = extracted_listing().to_string();
    let pipeline = create_pipeline(&[reply.as_str()]);
    let url = format!("{}/flat/2", server.uri());
    pipeline
        .queue
        .enqueue(QueueName::Scraping, PipelineTask::scrape(&url, "target-1"))
        .await
        .unwrap();

    let outcome = pipeline.manager.scrape_worker().run_once().await.unwrap();

    assert_eq!(
        outcome,
        StageOutcome::Rejected {
            url,
            reason: RejectReason::HeadingCount(2),
        }
    );
    assert_eq!(pipeline.llm.calls(), 0);
    assert!(pipeline.store.created().is_empty());
    // 任务已被消费，不会重新入队
    assert!(pipeline.queue.dequeue(QueueName::Scraping).await.unwrap().is_none());
}

#[tokio::test]
async fn test_search_page_metadata_rejected() {
    let server = MockServer::start().await;
    let html = "<html><head><title>Search results in Malaga</title></head>\
                <body><h1>Flats</h1></body></html>";
    serve_page(&server, "/search", 200, html.to_string()).await;

    let pipeline = create_pipeline(&[]);
    let url = format!("{}/search", server.uri());
    pipeline
        .queue
        .enqueue(QueueName::Scraping, PipelineTask::scrape(&url, "target-1"))
        .await
        .unwrap();

    let outcome = pipeline.manager.scrape_worker().run_once().await.unwrap();

    assert!(matches!(
        outcome,
        StageOutcome::Rejected {
            reason: RejectReason::MultiListingMetadata(_),
            ..
        }
    ));
    assert!(pipeline.store.created().is_empty());
}

#[tokio::test]
async fn test_record_without_files_is_never_posted() {
    let server = MockServer::start().await;
    serve_page(&server, "/flat/1", 200, listing_page_html()).await;

    let mut listing = extracted_listing();
    listing["files"] = json!([]);
    let reply = listing.to_string();
    let pipeline = create_pipeline(&[reply.as_str()]);
    let url = format!("{}/flat/1", server.uri());
    pipeline
        .queue
        .enqueue(QueueName::Scraping, PipelineTask::scrape(&url, "target-1"))
        .await
        .unwrap();

    let outcome = pipeline.manager.scrape_worker().run_once().await.unwrap();

    assert_eq!(
        outcome,
        StageOutcome::Rejected {
            url,
            reason: RejectReason::MissingMandatoryFields,
        }
    );
    assert!(pipeline.store.created().is_empty());
}

#[tokio::test]
async fn test_partial_record_accepted_by_fallback() {
    let server = MockServer::start().await;
    serve_page(&server, "/flat/1", 200, listing_page_html()).await;

    // 缺少地址和联系人，严格校验失败但必填字段齐全
    let reply = json!({
        "listing": {"listing_title": "Sunny flat", "price": "250000"},
        "files": ["https://listings.example/img/front.jpg"]
    })
    .to_string();
    let pipeline = create_pipeline(&[reply.as_str()]);
    let url = format!("{}/flat/1", server.uri());
    pipeline
        .queue
        .enqueue(QueueName::Scraping, PipelineTask::scrape(&url, "target-1"))
        .await
        .unwrap();

    let outcome = pipeline.manager.scrape_worker().run_once().await.unwrap();

    assert!(matches!(outcome, StageOutcome::Completed { .. }));
    assert_eq!(pipeline.store.created().len(), 1);
}

#[tokio::test]
async fn test_fetch_failure_rejects_page() {
    let server = MockServer::start().await;
    serve_page(&server, "/gone", 404, "not found".to_string()).await;

    let pipeline = create_pipeline(&[]);
    let url = format!("{}/gone", server.uri());
    pipeline
        .queue
        .enqueue(QueueName::Scraping, PipelineTask::scrape(&url, "target-1"))
        .await
        .unwrap();

    let outcome = pipeline.manager.scrape_worker().run_once().await.unwrap();

    assert_eq!(
        outcome,
        StageOutcome::Rejected {
            url,
            reason: RejectReason::FetchFailed(404),
        }
    );
    assert_eq!(pipeline.llm.calls(), 0);
}

#[tokio::test]
async fn test_llm_error_aborts_run_and_releases_lock() {
    let server = MockServer::start().await;
    serve_page(&server, "/flat/1", 200, listing_page_html()).await;

    let pipeline = create_pipeline(&[]);
    let url = format!("{}/flat/1", server.uri());
    pipeline
        .queue
        .enqueue(QueueName::Scraping, PipelineTask::scrape(&url, "target-1"))
        .await
        .unwrap();

    let result = pipeline.manager.scrape_worker().run_once().await;

    assert!(result.is_err());
    assert!(pipeline.store.created().is_empty());
    assert!(!pipeline.manager.lock().is_held());
}

#[tokio::test]
async fn test_empty_queue_is_idle() {
    let pipeline = create_pipeline(&[]);

    let outcome = pipeline.manager.scrape_worker().run_once().await.unwrap();

    assert_eq!(outcome, StageOutcome::Idle);
    assert!(!pipeline.manager.lock().is_held());
}

#[tokio::test]
async fn test_held_lock_skips_run_and_keeps_task() {
    let pipeline = create_pipeline(&[]);
    pipeline
        .queue
        .enqueue(
            QueueName::Scraping,
            PipelineTask::scrape("https://listings.example/flat/1", "target-1"),
        )
        .await
        .unwrap();
    assert!(pipeline.manager.lock().try_acquire().unwrap());

    let outcome = pipeline.manager.scrape_worker().run_once().await.unwrap();

    assert_eq!(outcome, StageOutcome::LockBusy);
    assert!(pipeline.manager.lock().is_held());
    assert_eq!(
        pipeline.queue.dequeue(QueueName::Scraping).await.unwrap(),
        Some(PipelineTask::scrape("https://listings.example/flat/1", "target-1"))
    );
}

#[tokio::test]
async fn test_unusable_queue_entry_does_not_block_later_tasks() {
    let server = MockServer::start().await;
    serve_page(&server, "/flat/1", 200, listing_page_html()).await;

    let reply = extracted_listing().to_string();
    let pipeline = create_pipeline(&[reply.as_str()]);
    let url = format!("{}/flat/1", server.uri());
    std::fs::write(
        &pipeline.manager.settings().queue.path,
        json!({
            "scraping": [
                {"website_url": "https://listings.example/broken"},
                {"website_url": url, "target_id": 42}
            ],
            "cleaning": [],
            "extracting": []
        })
        .to_string(),
    )
    .unwrap();

    let worker = pipeline.manager.scrape_worker();
    let first = worker.run_once().await;
    assert!(matches!(first, Err(WorkerError::InvalidTask(_))));
    assert!(!pipeline.manager.lock().is_held());

    let second = worker.run_once().await.unwrap();
    assert!(matches!(second, StageOutcome::Completed { .. }));
    assert_eq!(pipeline.store.created()[0].target_id, "42");
}
