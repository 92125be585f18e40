//! 单收件人派发执行器
//!
//! 读取偏好 → 规划渠道 → 对每个渠道依次执行：校验地址、解析模板、渲染、发送。
//! 同一收件人的渠道串行发送，各渠道结果独立归属。任何失败都以数据形式返回，
//! 公共入口不会返回错误。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use notify_shared::config::AppConfig;
use notify_shared::models::{Channel, UserPreference};
use notify_shared::observability::metrics;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::planner::{ChannelPlanner, effective_preference};
use crate::preference::PreferenceProvider;
use crate::sender::{ChannelSenders, SendMetadata, SenderIdentity};
use crate::template::{TemplateProvider, TemplateRenderer, TemplateResolver};
use crate::types::{
    ChannelResult, DispatchOptions, DispatchOutcome, DispatchResult, ERROR_TEMPLATE_NOT_FOUND,
    validate_notification_type,
};
use crate::validation::AddressValidator;

/// 派发执行器
#[derive(Clone)]
pub struct DispatchExecutor {
    preferences: Arc<dyn PreferenceProvider>,
    planner: ChannelPlanner,
    resolver: TemplateResolver,
    renderer: TemplateRenderer,
    senders: ChannelSenders,
    validator: AddressValidator,
    identity: SenderIdentity,
}

impl DispatchExecutor {
    pub fn new(
        preferences: Arc<dyn PreferenceProvider>,
        resolver: TemplateResolver,
        renderer: TemplateRenderer,
        senders: ChannelSenders,
    ) -> Self {
        Self {
            preferences,
            planner: ChannelPlanner::new(resolver.clone()),
            resolver,
            renderer,
            senders,
            validator: AddressValidator::default(),
            identity: SenderIdentity::default(),
        }
    }

    /// 按应用配置组装解析器、渲染器与地址校验
    pub fn from_config(
        config: &AppConfig,
        templates: Arc<dyn TemplateProvider>,
        preferences: Arc<dyn PreferenceProvider>,
        senders: ChannelSenders,
    ) -> Self {
        let resolver = TemplateResolver::from_config(templates, &config.templates);
        let renderer = TemplateRenderer::from_config(&config.templates);

        Self::new(preferences, resolver, renderer, senders)
            .with_validator(AddressValidator::new(config.delivery.min_phone_digits))
            .with_sender_identity(SenderIdentity::from_config(&config.delivery))
    }

    pub fn with_validator(mut self, validator: AddressValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_sender_identity(mut self, identity: SenderIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn resolver(&self) -> &TemplateResolver {
        &self.resolver
    }

    /// 按用户偏好派发一条通知
    #[instrument(skip(self, data, options), fields(outcome = tracing::field::Empty))]
    pub async fn send_notification_by_preference(
        &self,
        user_id: &str,
        notification_type: &str,
        data: &Value,
        options: &DispatchOptions,
    ) -> DispatchResult {
        let start = Instant::now();
        let result = self.dispatch(user_id, notification_type, data, options).await;

        tracing::Span::current().record("outcome", result.outcome.as_str());
        metrics::record_dispatch(result.outcome.as_str(), start.elapsed().as_secs_f64());
        result
    }

    async fn dispatch(
        &self,
        user_id: &str,
        notification_type: &str,
        data: &Value,
        options: &DispatchOptions,
    ) -> DispatchResult {
        if let Err(e) = validate_notification_type(notification_type) {
            warn!(user_id, error = %e, "派发请求被拒绝");
            return DispatchResult::not_dispatched(
                user_id,
                DispatchOutcome::InvalidRequest,
                e.to_string(),
            );
        }

        let stored = match self.preferences.get_preferences(user_id).await {
            Ok(preference) => preference,
            Err(e) => {
                warn!(user_id, error = %e, "用户偏好不可用，跳过派发");
                return DispatchResult::not_dispatched(
                    user_id,
                    DispatchOutcome::PreferencesUnavailable,
                    e.to_string(),
                );
            }
        };
        let preference = effective_preference(&stored);

        let plan = self.planner.plan(&preference, notification_type, options);
        if let Some(outcome) = plan.decision.outcome() {
            info!(
                user_id,
                notification_type,
                outcome = outcome.as_str(),
                "规划结果为不派发"
            );
            let mut result = DispatchResult::not_dispatched(
                user_id,
                outcome,
                plan.reason.unwrap_or_default(),
            );
            result.preferences_overridden = plan.preferences_overridden;
            return result;
        }

        let merged = merge_data(&preference, data);
        let requested_language = match preference.preferred_language.trim() {
            "" => self.resolver.fallback_language().to_string(),
            language => language.to_string(),
        };

        let mut results = BTreeMap::new();
        for channel in &plan.channels {
            let result = self
                .dispatch_channel(
                    *channel,
                    &preference,
                    notification_type,
                    &merged,
                    &requested_language,
                )
                .await;
            results.insert(*channel, result);
        }

        let result = DispatchResult::from_channel_results(
            user_id,
            plan.channels,
            results,
            options.tracks_combined_delivery(),
            plan.preferences_overridden,
        );

        info!(
            user_id,
            notification_type,
            outcome = result.outcome.as_str(),
            succeeded = result.success_count(),
            failed = result.failure_count(),
            "通知派发完成"
        );
        result
    }

    /// 单个渠道的派发，失败写入 `ChannelResult.error`
    async fn dispatch_channel(
        &self,
        channel: Channel,
        preference: &UserPreference,
        notification_type: &str,
        data: &Map<String, Value>,
        requested_language: &str,
    ) -> ChannelResult {
        let start = Instant::now();

        let address = match self.validator.validate(channel, preference.address_for(channel)) {
            Ok(address) => address,
            Err(e) => {
                debug!(%channel, user_id = %preference.user_id, error = %e, "收件地址无效");
                metrics::record_channel_send(channel.as_str(), "invalid_address", 0.0);
                return ChannelResult::failed(e.to_string(), requested_language);
            }
        };

        let resolved = match self
            .resolver
            .require(channel, notification_type, requested_language)
        {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(error = %e, "通知模板未找到");
                metrics::record_channel_send(channel.as_str(), "template_not_found", 0.0);
                return ChannelResult::failed(ERROR_TEMPLATE_NOT_FOUND, requested_language);
            }
        };

        let content = self.renderer.render(&resolved.template, data);
        let metadata = SendMetadata {
            recipient_id: preference.user_id.clone(),
            notification_type: notification_type.to_string(),
            language: resolved.language.clone(),
            from: self.identity.for_channel(channel).to_string(),
        };

        let sent = match self.senders.get(channel) {
            Ok(sender) => sender.send(address, &content, &metadata).await,
            Err(e) => Err(e),
        };
        let elapsed = start.elapsed().as_secs_f64();

        match sent {
            Ok(receipt) => {
                metrics::record_channel_send(channel.as_str(), "success", elapsed);
                ChannelResult::success(
                    receipt.message_id,
                    requested_language,
                    resolved.language,
                    resolved.fallback_used,
                )
            }
            Err(e) => {
                warn!(%channel, user_id = %preference.user_id, error = %e, "渠道发送失败");
                metrics::record_channel_send(channel.as_str(), "failed", elapsed);
                ChannelResult::send_failed(
                    e.to_string(),
                    requested_language,
                    resolved.language,
                    resolved.fallback_used,
                )
            }
        }
    }
}

/// 合并渲染数据
///
/// 优先级：请求数据 > 用户字段（user_id / name / email / phone）> 渲染器默认变量。
/// 请求数据中的 `null` 不覆盖用户字段。
fn merge_data(preference: &UserPreference, data: &Value) -> Map<String, Value> {
    let mut merged = Map::new();
    merged.insert("user_id".to_string(), Value::String(preference.user_id.clone()));
    merged.insert(
        "email".to_string(),
        Value::String(preference.email_address().to_string()),
    );
    if let Some(phone) = &preference.phone {
        merged.insert("phone".to_string(), Value::String(phone.clone()));
    }
    if let Some(name) = &preference.name {
        merged.insert("name".to_string(), Value::String(name.clone()));
    }

    match data {
        Value::Object(fields) => {
            for (key, value) in fields {
                if !value.is_null() {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
        Value::Null => {}
        other => debug!(data_type = ?other, "动态数据不是对象，已忽略"),
    }

    merged
}
