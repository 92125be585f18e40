//! 批量派发编排
//!
//! 将单收件人派发扇出到一组收件人：
//! - 并发模式（默认）：所有收件人的派发同时发起，由运行时交错 I/O 等待，忽略 `fail_fast`
//! - 顺序模式：按输入顺序逐个处理，`fail_fast` 时在首个失败（非跳过）的收件人处停止，
//!   其后的收件人不出现在结果中
//!
//! 可选的预检会在派发前确认基准（回退语言）模板存在，缺失时整批失败。

use std::time::Instant;

use futures::future::join_all;
use notify_shared::models::Channel;
use notify_shared::observability::metrics;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::dispatcher::DispatchExecutor;
use crate::types::{
    BatchResult, DispatchOptions, DispatchOutcome, DispatchResult, RecipientStatus,
    validate_notification_type,
};

/// 批量执行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    Parallel,
    Sequential,
}

impl BatchMode {
    pub fn from_options(options: &DispatchOptions) -> Self {
        if options.parallel_send {
            Self::Parallel
        } else {
            Self::Sequential
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Sequential => "sequential",
        }
    }
}

/// 批量编排器
#[derive(Clone)]
pub struct BatchOrchestrator {
    executor: DispatchExecutor,
}

impl BatchOrchestrator {
    pub fn new(executor: DispatchExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &DispatchExecutor {
        &self.executor
    }

    /// 批量派发
    ///
    /// 通知类型为空时直接拒绝，不做任何派发。
    #[instrument(
        skip(self, recipient_ids, data, options),
        fields(recipients = recipient_ids.len(), mode = BatchMode::from_options(options).as_str())
    )]
    pub async fn dispatch_batch(
        &self,
        recipient_ids: &[String],
        notification_type: &str,
        data: &Value,
        options: &DispatchOptions,
    ) -> BatchResult {
        if let Err(e) = validate_notification_type(notification_type) {
            error!(error = %e, "批量请求被拒绝");
            return BatchResult::rejected(e.to_string());
        }

        let start = Instant::now();
        let mode = BatchMode::from_options(options);

        if options.validate_templates_first
            && let Some(missing) = self.missing_baseline_template(notification_type, options)
        {
            let message = format!(
                "baseline {missing} template '{notification_type}' not found for language '{}'",
                self.executor.resolver().fallback_language()
            );
            error!(notification_type, channel = %missing, "基准模板缺失，整批失败");

            let results = recipient_ids
                .iter()
                .map(|id| {
                    DispatchResult::not_dispatched(
                        id.as_str(),
                        DispatchOutcome::TemplatesUnavailable,
                        message.clone(),
                    )
                })
                .collect();
            let mut batch = BatchResult::from_results(results, start.elapsed().as_secs_f64());
            batch.error = Some(message);
            metrics::record_batch(mode.as_str(), recipient_ids.len(), batch.processing_time_seconds);
            return batch;
        }

        let results = match mode {
            BatchMode::Parallel => {
                if options.fail_fast {
                    warn!("并发模式下忽略 fail_fast");
                }
                self.run_parallel(recipient_ids, notification_type, data, options)
                    .await
            }
            BatchMode::Sequential => {
                self.run_sequential(recipient_ids, notification_type, data, options)
                    .await
            }
        };

        let batch = BatchResult::from_results(results, start.elapsed().as_secs_f64());
        metrics::record_batch(mode.as_str(), batch.processed_count, batch.processing_time_seconds);

        info!(
            notification_type,
            processed = batch.processed_count,
            success = batch.status_counts.success,
            skipped = batch.status_counts.skipped,
            failed = batch.status_counts.failed,
            elapsed_secs = batch.processing_time_seconds,
            "批量派发完成"
        );
        batch
    }

    /// 回退语言下缺失的基准模板
    ///
    /// 邮件模板总是检查；短信模板只在要求全渠道时检查。
    fn missing_baseline_template(
        &self,
        notification_type: &str,
        options: &DispatchOptions,
    ) -> Option<Channel> {
        let resolver = self.executor.resolver();
        let baseline = resolver.fallback_language();

        if !resolver.has_template(Channel::Email, notification_type, baseline) {
            return Some(Channel::Email);
        }
        if options.require_all_channels
            && !resolver.has_template(Channel::Sms, notification_type, baseline)
        {
            return Some(Channel::Sms);
        }
        None
    }

    async fn run_parallel(
        &self,
        recipient_ids: &[String],
        notification_type: &str,
        data: &Value,
        options: &DispatchOptions,
    ) -> Vec<DispatchResult> {
        let dispatches = recipient_ids.iter().map(|id| {
            self.executor
                .send_notification_by_preference(id, notification_type, data, options)
        });

        join_all(dispatches).await
    }

    async fn run_sequential(
        &self,
        recipient_ids: &[String],
        notification_type: &str,
        data: &Value,
        options: &DispatchOptions,
    ) -> Vec<DispatchResult> {
        let mut results = Vec::with_capacity(recipient_ids.len());

        for id in recipient_ids {
            let result = self
                .executor
                .send_notification_by_preference(id, notification_type, data, options)
                .await;
            let failed = result.status() == RecipientStatus::Failed;
            results.push(result);

            if failed && options.fail_fast {
                warn!(
                    recipient_id = %id,
                    remaining = recipient_ids.len() - results.len(),
                    "收件人派发失败，fail_fast 停止后续处理"
                );
                break;
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::preference::InMemoryPreferenceStore;
    use crate::sender::{ChannelSenders, SimulatedSender};
    use crate::template::{InMemoryTemplateStore, Template, TemplateRenderer, TemplateResolver};
    use notify_shared::test_utils::TestDataGenerator;
    use serde_json::json;

    fn orchestrator(store: InMemoryPreferenceStore, templates: InMemoryTemplateStore) -> BatchOrchestrator {
        let executor = DispatchExecutor::new(
            Arc::new(store),
            TemplateResolver::new(Arc::new(templates)),
            TemplateRenderer::default(),
            ChannelSenders::new()
                .register(Arc::new(SimulatedSender::new(Channel::Email)))
                .register(Arc::new(SimulatedSender::new(Channel::Sms))),
        );
        BatchOrchestrator::new(executor)
    }

    fn welcome_templates() -> InMemoryTemplateStore {
        let templates = InMemoryTemplateStore::new();
        templates.upsert("welcome", "en", Template::email("Welcome", "Hi {{name}}"));
        templates
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_notification_type_rejected() {
        let orchestrator = orchestrator(InMemoryPreferenceStore::new(), welcome_templates());
        let batch = orchestrator
            .dispatch_batch(&ids(&["a@example.com"]), " ", &json!({}), &DispatchOptions::default())
            .await;

        assert!(!batch.success);
        assert_eq!(batch.processed_count, 0);
        assert!(batch.results.is_empty());
        assert!(batch
            .error
            .as_deref()
            .is_some_and(|e| e.contains("notification type is required")));
    }

    #[tokio::test]
    async fn test_empty_recipient_list() {
        let orchestrator = orchestrator(InMemoryPreferenceStore::new(), welcome_templates());
        let batch = orchestrator
            .dispatch_batch(&[], "welcome", &json!({}), &DispatchOptions::default())
            .await;

        assert!(!batch.success);
        assert_eq!(batch.processed_count, 0);
        assert!(batch.error.is_none());
    }

    #[tokio::test]
    async fn test_parallel_classification() {
        let store = InMemoryPreferenceStore::preferences_for([
            TestDataGenerator::email_only("ok"),
            TestDataGenerator::opted_out("out"),
            TestDataGenerator::invalid_email("bad"),
        ]);
        let orchestrator = orchestrator(store, welcome_templates());

        let batch = orchestrator
            .dispatch_batch(&ids(&["ok", "out", "bad"]), "welcome", &json!({}), &DispatchOptions::default())
            .await;

        assert!(batch.success);
        assert_eq!(batch.processed_count, 3);
        assert_eq!(batch.status_counts.success, 1);
        assert_eq!(batch.status_counts.skipped, 1);
        assert_eq!(batch.status_counts.failed, 1);
    }

    #[tokio::test]
    async fn test_sequential_fail_fast_truncates() {
        let store = InMemoryPreferenceStore::preferences_for([
            TestDataGenerator::email_only("a"),
            TestDataGenerator::invalid_email("b"),
            TestDataGenerator::email_only("c"),
        ]);
        let orchestrator = orchestrator(store, welcome_templates());
        let options = DispatchOptions::default()
            .with_parallel_send(false)
            .with_fail_fast(true);

        let batch = orchestrator
            .dispatch_batch(&ids(&["a", "b", "c"]), "welcome", &json!({}), &options)
            .await;

        assert_eq!(batch.results.len(), 2);
        assert_eq!(batch.results[0].recipient_id, "a");
        assert_eq!(batch.results[1].recipient_id, "b");
        assert_eq!(batch.status_counts.failed, 1);
    }

    #[tokio::test]
    async fn test_fail_fast_does_not_stop_on_skipped() {
        let store = InMemoryPreferenceStore::preferences_for([
            TestDataGenerator::opted_out("a"),
            TestDataGenerator::email_only("b"),
        ]);
        let orchestrator = orchestrator(store, welcome_templates());
        let options = DispatchOptions::default()
            .with_parallel_send(false)
            .with_fail_fast(true);

        let batch = orchestrator
            .dispatch_batch(&ids(&["a", "b"]), "welcome", &json!({}), &options)
            .await;

        assert_eq!(batch.processed_count, 2);
        assert_eq!(batch.status_counts.skipped, 1);
        assert_eq!(batch.status_counts.success, 1);
    }

    #[tokio::test]
    async fn test_parallel_ignores_fail_fast() {
        let store = InMemoryPreferenceStore::preferences_for([
            TestDataGenerator::invalid_email("a"),
            TestDataGenerator::email_only("b"),
        ]);
        let orchestrator = orchestrator(store, welcome_templates());
        let options = DispatchOptions::default().with_fail_fast(true);

        let batch = orchestrator
            .dispatch_batch(&ids(&["a", "b"]), "welcome", &json!({}), &options)
            .await;

        assert_eq!(batch.processed_count, 2);
    }

    #[tokio::test]
    async fn test_preflight_missing_email_template_fails_batch() {
        let orchestrator = orchestrator(InMemoryPreferenceStore::new(), welcome_templates());
        let options = DispatchOptions::default().with_validate_templates_first(true);

        let batch = orchestrator
            .dispatch_batch(&ids(&["a@example.com", "b@example.com"]), "unknown", &json!({}), &options)
            .await;

        assert!(!batch.success);
        assert_eq!(batch.processed_count, 2);
        assert_eq!(batch.status_counts.failed, 2);
        assert!(batch.error.as_deref().unwrap().contains("email"));
        assert!(batch
            .results
            .iter()
            .all(|r| r.outcome == DispatchOutcome::TemplatesUnavailable));
    }

    #[tokio::test]
    async fn test_preflight_sms_checked_only_when_required() {
        let orchestrator = orchestrator(InMemoryPreferenceStore::new(), welcome_templates());
        let recipients = ids(&["a@example.com"]);

        let lenient = DispatchOptions::default().with_validate_templates_first(true);
        let batch = orchestrator
            .dispatch_batch(&recipients, "welcome", &json!({}), &lenient)
            .await;
        assert!(batch.success);

        let strict = lenient.with_require_all_channels(true);
        let batch = orchestrator
            .dispatch_batch(&recipients, "welcome", &json!({}), &strict)
            .await;
        assert!(!batch.success);
        assert!(batch.error.as_deref().unwrap().contains("sms"));
    }
}
