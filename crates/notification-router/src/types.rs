//! 派发相关类型定义
//!
//! 定义派发选项、单渠道结果、单收件人结果以及批量结果。
//! 所有结果都是数据而非错误：调用方根据 `success` 与各渠道明细决定上层重试策略。

use std::collections::BTreeMap;

use notify_shared::error::NotifyError;
use notify_shared::models::Channel;
use serde::{Deserialize, Serialize};

use crate::error::{NotificationError, Result};

/// 规划阶段的诊断信息：用户未开启任何渠道
pub const REASON_NO_CHANNELS: &str = "no channels enabled";
/// 规划阶段的诊断信息：要求全渠道但部分渠道缺少模板
pub const REASON_TEMPLATES_UNAVAILABLE: &str = "templates not available for all required channels";
/// 渠道结果错误：模板未找到
pub const ERROR_TEMPLATE_NOT_FOUND: &str = "Template not found";

/// 公共入口的前置校验：通知类型不能为空
pub fn validate_notification_type(notification_type: &str) -> Result<()> {
    if notification_type.trim().is_empty() {
        return Err(NotificationError::InvalidRequest(
            "notification type is required".to_string(),
        ));
    }
    Ok(())
}

/// 派发选项
///
/// 每次调用独立持有，批量派发时按收件人各自克隆，不在收件人之间共享。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchOptions {
    /// 用户关闭全部渠道时仍然发送
    pub force_send: bool,
    /// 只走有模板的渠道，追踪组合投递状态
    pub combined_only: bool,
    /// 所有开启的渠道都必须有模板，否则不派发
    pub require_all_channels: bool,
    /// 批量时并发处理收件人
    pub parallel_send: bool,
    /// 顺序批量时遇到首个失败即停止
    pub fail_fast: bool,
    /// 批量前先校验基准模板
    pub validate_templates_first: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            force_send: false,
            combined_only: false,
            require_all_channels: false,
            parallel_send: true,
            fail_fast: false,
            validate_templates_first: false,
        }
    }
}

impl DispatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force_send(mut self, force_send: bool) -> Self {
        self.force_send = force_send;
        self
    }

    pub fn with_combined_only(mut self, combined_only: bool) -> Self {
        self.combined_only = combined_only;
        self
    }

    pub fn with_require_all_channels(mut self, require_all_channels: bool) -> Self {
        self.require_all_channels = require_all_channels;
        self
    }

    pub fn with_parallel_send(mut self, parallel_send: bool) -> Self {
        self.parallel_send = parallel_send;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_validate_templates_first(mut self, validate: bool) -> Self {
        self.validate_templates_first = validate;
        self
    }

    /// 是否需要追踪组合投递（combined / partial）
    pub fn tracks_combined_delivery(&self) -> bool {
        self.combined_only || self.require_all_channels
    }
}

/// 单渠道发送结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub language_fallback_used: bool,
    pub requested_language: String,
    pub actual_language: String,
}

impl ChannelResult {
    /// 创建成功结果
    pub fn success(
        message_id: impl Into<String>,
        requested_language: impl Into<String>,
        actual_language: impl Into<String>,
        language_fallback_used: bool,
    ) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
            language_fallback_used,
            requested_language: requested_language.into(),
            actual_language: actual_language.into(),
        }
    }

    /// 创建失败结果
    ///
    /// 未解析到模板时实际语言记为请求语言。
    pub fn failed(error: impl Into<String>, requested_language: impl Into<String>) -> Self {
        let requested_language = requested_language.into();
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
            language_fallback_used: false,
            actual_language: requested_language.clone(),
            requested_language,
        }
    }

    /// 模板已解析但发送失败
    pub fn send_failed(
        error: impl Into<String>,
        requested_language: impl Into<String>,
        actual_language: impl Into<String>,
        language_fallback_used: bool,
    ) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
            language_fallback_used,
            requested_language: requested_language.into(),
            actual_language: actual_language.into(),
        }
    }
}

/// 单收件人派发结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// 全部规划渠道发送成功
    Delivered,
    /// 部分渠道成功
    PartiallyDelivered,
    /// 尝试了发送，但没有任何渠道成功
    Failed,
    /// 用户未开启任何渠道且未强制发送
    OptedOut,
    /// 要求全渠道但模板不齐，未尝试发送
    TemplatesUnavailable,
    /// 偏好提供方无法给出记录（未知收件人）
    PreferencesUnavailable,
    /// 请求本身无效（如缺少通知类型），未做任何处理
    InvalidRequest,
}

impl DispatchOutcome {
    /// 批量统计用的三分类
    pub fn status(&self) -> RecipientStatus {
        match self {
            Self::Delivered | Self::PartiallyDelivered => RecipientStatus::Success,
            Self::OptedOut | Self::PreferencesUnavailable => RecipientStatus::Skipped,
            Self::Failed | Self::TemplatesUnavailable | Self::InvalidRequest => {
                RecipientStatus::Failed
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::PartiallyDelivered => "partially_delivered",
            Self::Failed => "failed",
            Self::OptedOut => "opted_out",
            Self::TemplatesUnavailable => "templates_unavailable",
            Self::PreferencesUnavailable => "preferences_unavailable",
            Self::InvalidRequest => "invalid_request",
        }
    }
}

/// 批量统计中的收件人分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientStatus {
    Success,
    Skipped,
    Failed,
}

/// 单收件人派发结果
///
/// `combined_delivery` / `partial_delivery` 只在请求了 `combined_only` 或
/// `require_all_channels` 时给出，其余情况为 `None` 且不序列化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub recipient_id: String,
    pub success: bool,
    pub channels: Vec<Channel>,
    pub results: BTreeMap<Channel, ChannelResult>,
    pub outcome: DispatchOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined_delivery: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_delivery: Option<bool>,
    pub preferences_overridden: bool,
}

impl DispatchResult {
    /// 未进入发送阶段的结果（退订、模板不齐、偏好不可用）
    pub fn not_dispatched(
        recipient_id: impl Into<String>,
        outcome: DispatchOutcome,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            success: false,
            channels: Vec::new(),
            results: BTreeMap::new(),
            outcome,
            reason: Some(reason.into()),
            combined_delivery: None,
            partial_delivery: None,
            preferences_overridden: false,
        }
    }

    /// 根据各渠道结果汇总
    ///
    /// 至少一个渠道成功即视为成功。
    pub fn from_channel_results(
        recipient_id: impl Into<String>,
        channels: Vec<Channel>,
        results: BTreeMap<Channel, ChannelResult>,
        track_combined: bool,
        preferences_overridden: bool,
    ) -> Self {
        let succeeded = results.values().filter(|r| r.success).count();
        let all_succeeded = !channels.is_empty() && succeeded == channels.len();

        let outcome = if all_succeeded {
            DispatchOutcome::Delivered
        } else if succeeded > 0 {
            DispatchOutcome::PartiallyDelivered
        } else {
            DispatchOutcome::Failed
        };

        let (combined_delivery, partial_delivery) = if track_combined {
            (Some(all_succeeded), Some(succeeded > 0 && !all_succeeded))
        } else {
            (None, None)
        };

        Self {
            recipient_id: recipient_id.into(),
            success: succeeded > 0,
            channels,
            results,
            outcome,
            reason: None,
            combined_delivery,
            partial_delivery,
            preferences_overridden,
        }
    }

    pub fn status(&self) -> RecipientStatus {
        self.outcome.status()
    }

    pub fn success_count(&self) -> usize {
        self.results.values().filter(|r| r.success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.values().filter(|r| !r.success).count()
    }
}

/// 批量统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: RecipientStatus) {
        match status {
            RecipientStatus::Success => self.success += 1,
            RecipientStatus::Skipped => self.skipped += 1,
            RecipientStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }
}

/// 批量派发结果
///
/// 返回后不再修改。`fail_fast` 截断的顺序批量中，未处理的收件人不出现在 `results` 里。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success: bool,
    pub processed_count: usize,
    pub status_counts: StatusCounts,
    pub processing_time_seconds: f64,
    pub results: Vec<DispatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResult {
    /// 批量级致命错误，未尝试任何派发
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            processed_count: 0,
            status_counts: StatusCounts::default(),
            processing_time_seconds: 0.0,
            results: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// 由派发结果汇总
    pub fn from_results(results: Vec<DispatchResult>, processing_time_seconds: f64) -> Self {
        let mut status_counts = StatusCounts::default();
        for result in &results {
            status_counts.record(result.status());
        }

        Self {
            success: status_counts.success > 0,
            processed_count: results.len(),
            status_counts,
            processing_time_seconds,
            results,
            error: None,
        }
    }
}

/// 通知请求信封
///
/// CLI 从 JSON 文件读取的批量请求格式。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub recipient_ids: Vec<String>,
    pub notification_type: String,
    #[serde(default = "empty_object")]
    pub data: serde_json::Value,
    #[serde(default)]
    pub options: DispatchOptions,
}

impl NotificationRequest {
    /// 从 JSON 文本解析请求并校验通知类型
    pub fn from_json(content: &str) -> Result<Self> {
        let request: Self = serde_json::from_str(content).map_err(NotifyError::from)?;
        validate_notification_type(&request.notification_type)?;
        Ok(request)
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
