// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{
    create_pipeline, create_pipeline_with, refined_fields, stored_listing, test_settings,
};
use listing_pipeline::domain::models::agent_status::{AgentName, AgentState, QueuedAgentTask};
use listing_pipeline::domain::models::scraping_result::ResultStatus;
use listing_pipeline::domain::models::task::{PipelineTask, QueueName};
use listing_pipeline::queue::task_queue::TaskQueue;
use listing_pipeline::utils::errors::WorkerError;
use listing_pipeline::workers::{StageOutcome, Worker};
use serde_json::{json, Value};
use tempfile::TempDir;

#[tokio::test]
async fn test_cleaning_success_persists_record_and_status() {
    let reply = refined_fields();
    let pipeline = create_pipeline(&[reply.as_str()]);
    pipeline.store.insert_result("r1", stored_listing());
    pipeline.store.queue_agent_task(
        AgentName::Cleaning,
        "status-1",
        "r1",
        Some("2025-01-01T00:00:00Z"),
    );

    let outcome = pipeline.manager.cleaning_worker().run_once().await.unwrap();

    assert_eq!(
        outcome,
        StageOutcome::Completed {
            scraping_result_id: "r1".to_string(),
            status: ResultStatus::InProgress,
        }
    );

    let updates = pipeline.store.result_updates();
    assert_eq!(updates.len(), 1);
    let update = &updates[0];
    assert_eq!(update.id, "r1");
    assert_eq!(update.progress, 66);
    assert_eq!(update.status, ResultStatus::InProgress);
    assert_eq!(update.target_id, "target-1");
    assert_eq!(update.scraped_at.as_deref(), Some("2025-01-01T00:00:00Z"));
    assert!(update.error.is_none());
    assert_eq!(update.data["listing"]["listing_title"], json!("Bright house"));
    assert_eq!(update.data["files"], json!(["https://img/1.jpg", "https://img/2.jpg"]));
    assert!(update.data.get("amenities").is_none());

    let statuses = pipeline.store.agent_updates();
    assert_eq!(statuses.len(), 1);
    let status = &statuses[0];
    assert_eq!(status.id, "status-1");
    assert_eq!(status.agent_name, AgentName::Cleaning);
    assert_eq!(status.status, AgentState::Success);
    assert_eq!(status.start_time, "2025-01-01T00:00:00Z");
    assert_eq!(status.scraping_result_id, "r1");

    let request = &pipeline.llm.requests()[0];
    assert!(request.prompt.contains("listing_title: Cassa luminosa"));
    assert!(!pipeline.manager.lock().is_held());
}

#[tokio::test]
async fn test_cleaning_llm_failure_persists_original_data() {
    let pipeline = create_pipeline(&[]);
    pipeline.store.insert_result("r1", stored_listing());
    pipeline
        .store
        .queue_agent_task(AgentName::Cleaning, "status-1", "r1", None);

    let outcome = pipeline.manager.cleaning_worker().run_once().await.unwrap();

    assert_eq!(
        outcome,
        StageOutcome::Completed {
            scraping_result_id: "r1".to_string(),
            status: ResultStatus::Failed,
        }
    );

    let update = &pipeline.store.result_updates()[0];
    assert_eq!(update.data, stored_listing());
    assert_eq!(update.status, ResultStatus::Failed);
    assert_eq!(update.progress, 66);
    assert!(update.error.as_deref().is_some_and(|e| !e.is_empty()));

    let status = &pipeline.store.agent_updates()[0];
    assert_eq!(status.status, AgentState::Failed);
    // 没有排队时间时使用本次运行的开始时间
    assert!(chrono::DateTime::parse_from_rfc3339(&status.start_time).is_ok());
}

#[tokio::test]
async fn test_cleaning_non_json_reply_persists_original_data() {
    let pipeline = create_pipeline(&["I could not translate this listing."]);
    pipeline.store.insert_result("r1", stored_listing());
    pipeline
        .store
        .queue_agent_task(AgentName::Cleaning, "status-1", "r1", None);

    pipeline.manager.cleaning_worker().run_once().await.unwrap();

    let update = &pipeline.store.result_updates()[0];
    assert_eq!(update.data, stored_listing());
    assert_eq!(update.status, ResultStatus::Failed);
    assert!(update.error.is_some());
}

#[tokio::test]
async fn test_cleaning_status_and_files_limit_configurable() {
    let dir = TempDir::new().unwrap();
    let mut settings = test_settings(&dir);
    settings.pipeline.cleaning_success_status = ResultStatus::Success;
    settings.pipeline.cleaning_files_limit = 0;

    let reply = refined_fields();
    let pipeline = create_pipeline_with(settings, dir, &[reply.as_str()]);
    pipeline.store.insert_result("r1", stored_listing());
    pipeline
        .store
        .queue_agent_task(AgentName::Cleaning, "status-1", "r1", None);

    pipeline.manager.cleaning_worker().run_once().await.unwrap();

    let update = &pipeline.store.result_updates()[0];
    assert_eq!(update.status, ResultStatus::Success);
    assert_eq!(update.data["files"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_enhancement_completes_pipeline() {
    let reply = refined_fields();
    let pipeline = create_pipeline(&[reply.as_str()]);
    pipeline.store.insert_result("r1", stored_listing());
    pipeline
        .store
        .queue_agent_task(AgentName::Extracting, "status-3", "r1", None);

    let outcome = pipeline
        .manager
        .enhancement_worker()
        .run_once()
        .await
        .unwrap();

    assert_eq!(
        outcome,
        StageOutcome::Completed {
            scraping_result_id: "r1".to_string(),
            status: ResultStatus::Success,
        }
    );

    let update = &pipeline.store.result_updates()[0];
    assert_eq!(update.progress, 100);
    assert_eq!(update.data["contact"]["email_address"], Value::Null);
    assert_eq!(update.data["files"].as_array().map(Vec::len), Some(3));

    let status = &pipeline.store.agent_updates()[0];
    assert_eq!(status.agent_name, AgentName::Extracting);
    assert_eq!(status.status, AgentState::Success);

    let request = &pipeline.llm.requests()[0];
    assert!((request.temperature - 0.3).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_enhancement_failure_marks_failed() {
    let pipeline = create_pipeline(&["```json\n[1, 2, 3]\n```"]);
    pipeline.store.insert_result("r1", stored_listing());
    pipeline
        .store
        .queue_agent_task(AgentName::Extracting, "status-3", "r1", None);

    pipeline
        .manager
        .enhancement_worker()
        .run_once()
        .await
        .unwrap();

    let update = &pipeline.store.result_updates()[0];
    assert_eq!(update.data, stored_listing());
    assert_eq!(update.status, ResultStatus::Failed);
    assert_eq!(update.progress, 100);
    assert_eq!(pipeline.store.agent_updates()[0].status, AgentState::Failed);
}

#[tokio::test]
async fn test_local_queue_checked_before_remote() {
    let reply = refined_fields();
    let pipeline = create_pipeline(&[reply.as_str()]);
    pipeline.store.insert_result("r1", stored_listing());
    pipeline.store.insert_result("r2", stored_listing());
    pipeline
        .store
        .queue_agent_task(AgentName::Cleaning, "status-remote", "r1", None);
    pipeline
        .queue
        .enqueue(QueueName::Cleaning, PipelineTask::refine("r2", "status-local"))
        .await
        .unwrap();

    pipeline.manager.cleaning_worker().run_once().await.unwrap();

    let status = &pipeline.store.agent_updates()[0];
    assert_eq!(status.id, "status-local");
    assert_eq!(status.scraping_result_id, "r2");
    assert!(pipeline.queue.dequeue(QueueName::Cleaning).await.unwrap().is_none());
}

#[tokio::test]
async fn test_nothing_queued_is_idle() {
    let pipeline = create_pipeline(&[]);
    pipeline
        .store
        .queue_agent_task(AgentName::Extracting, "status-3", "r1", None);

    let outcome = pipeline.manager.cleaning_worker().run_once().await.unwrap();

    assert_eq!(outcome, StageOutcome::Idle);
    assert!(pipeline.store.result_updates().is_empty());
    assert_eq!(pipeline.llm.calls(), 0);
}

#[tokio::test]
async fn test_missing_record_aborts_without_updates() {
    let pipeline = create_pipeline(&[]);
    pipeline
        .store
        .queue_agent_task(AgentName::Cleaning, "status-1", "missing", None);

    let result = pipeline.manager.cleaning_worker().run_once().await;

    assert!(result.is_err());
    assert!(pipeline.store.result_updates().is_empty());
    assert!(pipeline.store.agent_updates().is_empty());
    assert!(!pipeline.manager.lock().is_held());
}

#[tokio::test]
async fn test_held_lock_skips_refine_run() {
    let pipeline = create_pipeline(&[]);
    pipeline.store.insert_result("r1", stored_listing());
    pipeline
        .store
        .queue_agent_task(AgentName::Cleaning, "status-1", "r1", None);
    let _guard = pipeline.manager.lock().guard().unwrap().unwrap();

    let outcome = pipeline.manager.cleaning_worker().run_once().await.unwrap();

    assert_eq!(outcome, StageOutcome::LockBusy);
    assert!(pipeline.store.result_updates().is_empty());
}

#[tokio::test]
async fn test_queued_row_without_id_is_invalid() {
    let pipeline = create_pipeline(&[]);
    pipeline.store.insert_result("r1", stored_listing());
    pipeline.store.queue_agent_row(
        AgentName::Cleaning,
        QueuedAgentTask {
            id: None,
            scraping_result_id: Some("r1".to_string()),
            start_time: None,
        },
    );

    let result = pipeline.manager.cleaning_worker().run_once().await;

    assert!(matches!(result, Err(WorkerError::InvalidTask(_))));
    assert!(pipeline.store.result_updates().is_empty());
    assert!(pipeline.store.agent_updates().is_empty());
    assert_eq!(pipeline.llm.calls(), 0);
    assert!(!pipeline.manager.lock().is_held());
}
