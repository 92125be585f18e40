//! 批量派发集成测试
//!
//! 覆盖并发与顺序两种模式、fail_fast 截断、首次用户的默认偏好以及基准模板预检。

use std::sync::Arc;
use std::time::Duration;

use notification_router::{
    BatchOrchestrator, ChannelSenders, DispatchExecutor, DispatchOptions, InMemoryPreferenceStore,
    InMemoryTemplateStore, PreferenceProvider, SimulatedSender,
};
use notify_shared::models::Channel;
use notify_shared::test_utils::{TestDataGenerator, test_app_config, test_email};
use serde_json::json;

fn orchestrator_with(
    preferences: Arc<InMemoryPreferenceStore>,
    email: Arc<SimulatedSender>,
) -> BatchOrchestrator {
    let executor = DispatchExecutor::from_config(
        &test_app_config(),
        Arc::new(InMemoryTemplateStore::with_defaults()),
        preferences,
        ChannelSenders::new()
            .register(email)
            .register(Arc::new(SimulatedSender::new(Channel::Sms))),
    );
    BatchOrchestrator::new(executor)
}

#[tokio::test]
async fn test_parallel_batch_with_first_time_users() {
    let known: Vec<String> = (0..3).map(|i| format!("known-{i}")).collect();
    let first_time = vec![test_email(), test_email()];

    let preferences = Arc::new(InMemoryPreferenceStore::preferences_for(
        known.iter().map(|id| TestDataGenerator::email_only(id)),
    ));
    let orchestrator = orchestrator_with(
        preferences.clone(),
        Arc::new(SimulatedSender::new(Channel::Email)),
    );

    let recipients: Vec<String> = known.iter().chain(first_time.iter()).cloned().collect();
    let batch = orchestrator
        .dispatch_batch(&recipients, "welcome", &json!({}), &DispatchOptions::default())
        .await;

    assert!(batch.success);
    assert_eq!(batch.processed_count, 5);
    assert_eq!(batch.status_counts.success, 5);
    assert_eq!(batch.status_counts.failed, 0);
    assert!(batch.error.is_none());

    // 首次用户的默认偏好作为副作用被存储
    for id in &first_time {
        assert!(preferences.contains(id));
        let pref = preferences.get_preferences(id).await.unwrap();
        assert!(pref.email_enabled);
        assert!(!pref.sms_enabled);
    }
}

#[tokio::test]
async fn test_sequential_fail_fast_stops_after_second_recipient() {
    let preferences = Arc::new(InMemoryPreferenceStore::preferences_for([
        TestDataGenerator::email_only("r1"),
        TestDataGenerator::invalid_email("r2"),
        TestDataGenerator::email_only("r3"),
        TestDataGenerator::email_only("r4"),
    ]));
    let email = Arc::new(SimulatedSender::new(Channel::Email));
    let orchestrator = orchestrator_with(preferences, email.clone());

    let options = DispatchOptions::default()
        .with_parallel_send(false)
        .with_fail_fast(true);
    let recipients: Vec<String> = ["r1", "r2", "r3", "r4"].iter().map(|s| s.to_string()).collect();

    let batch = orchestrator
        .dispatch_batch(&recipients, "welcome", &json!({}), &options)
        .await;

    assert_eq!(batch.results.len(), 2);
    assert_eq!(batch.processed_count, 2);
    assert_eq!(batch.status_counts.failed, 1);
    assert_eq!(batch.status_counts.success, 1);
    assert_eq!(
        batch.results[1].results[&Channel::Email].error.as_deref(),
        Some("Invalid email format")
    );
    // r3、r4 未被处理
    assert_eq!(email.sent_count(), 1);
}

#[tokio::test]
async fn test_sequential_without_fail_fast_processes_everyone_in_order() {
    let preferences = Arc::new(InMemoryPreferenceStore::preferences_for([
        TestDataGenerator::invalid_email("r1"),
        TestDataGenerator::opted_out("r2"),
        TestDataGenerator::email_only("r3"),
    ]));
    let orchestrator = orchestrator_with(preferences, Arc::new(SimulatedSender::new(Channel::Email)));

    let options = DispatchOptions::default().with_parallel_send(false);
    let recipients: Vec<String> = ["r1", "r2", "r3"].iter().map(|s| s.to_string()).collect();
    let batch = orchestrator
        .dispatch_batch(&recipients, "welcome", &json!({}), &options)
        .await;

    let order: Vec<&str> = batch.results.iter().map(|r| r.recipient_id.as_str()).collect();
    assert_eq!(order, vec!["r1", "r2", "r3"]);
    assert_eq!(batch.status_counts.failed, 1);
    assert_eq!(batch.status_counts.skipped, 1);
    assert_eq!(batch.status_counts.success, 1);
    assert!(batch.success);
}

#[tokio::test]
async fn test_parallel_batch_interleaves_sends() {
    let ids: Vec<String> = (0..10).map(|i| format!("user-{i}")).collect();
    let preferences = Arc::new(InMemoryPreferenceStore::preferences_for(
        ids.iter().map(|id| TestDataGenerator::email_only(id)),
    ));
    let email = Arc::new(SimulatedSender::new(Channel::Email).with_delay(Duration::from_millis(50)));
    let orchestrator = orchestrator_with(preferences, email.clone());

    let batch = orchestrator
        .dispatch_batch(&ids, "welcome", &json!({}), &DispatchOptions::default())
        .await;

    assert_eq!(batch.status_counts.success, 10);
    assert_eq!(email.sent_count(), 10);
    // 串行需要 500ms 以上，并发下远小于此
    assert!(batch.processing_time_seconds < 0.4);
}

#[tokio::test]
async fn test_all_sends_failing_marks_batch_unsuccessful() {
    let preferences = Arc::new(InMemoryPreferenceStore::preferences_for([
        TestDataGenerator::email_only("a"),
        TestDataGenerator::email_only("b"),
    ]));
    let orchestrator = orchestrator_with(
        preferences,
        Arc::new(SimulatedSender::new(Channel::Email).failing()),
    );

    let recipients = vec!["a".to_string(), "b".to_string()];
    let batch = orchestrator
        .dispatch_batch(&recipients, "welcome", &json!({}), &DispatchOptions::default())
        .await;

    assert!(!batch.success);
    assert_eq!(batch.status_counts.failed, 2);
    assert!(batch.results.iter().all(|r| r.results[&Channel::Email].error.is_some()));
}

#[tokio::test]
async fn test_preflight_rejects_unknown_template() {
    let orchestrator = orchestrator_with(
        Arc::new(InMemoryPreferenceStore::new()),
        Arc::new(SimulatedSender::new(Channel::Email)),
    );
    let options = DispatchOptions::default().with_validate_templates_first(true);
    let recipients = vec![test_email(), test_email(), test_email()];

    let batch = orchestrator
        .dispatch_batch(&recipients, "does_not_exist", &json!({}), &options)
        .await;

    assert!(!batch.success);
    assert_eq!(batch.processed_count, 3);
    assert_eq!(batch.status_counts.failed, 3);
    assert!(batch.error.is_some());
}

#[tokio::test]
async fn test_batch_result_serializes_camel_case() {
    let orchestrator = orchestrator_with(
        Arc::new(InMemoryPreferenceStore::new()),
        Arc::new(SimulatedSender::new(Channel::Email)),
    );
    let batch = orchestrator
        .dispatch_batch(&[test_email()], "welcome", &json!({}), &DispatchOptions::default())
        .await;

    let json = serde_json::to_value(&batch).unwrap();
    assert_eq!(json["processedCount"], 1);
    assert_eq!(json["statusCounts"]["success"], 1);
    assert!(json["processingTimeSeconds"].is_number());
    assert!(json.get("error").is_none());
}
