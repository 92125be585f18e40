//! 基于偏好的渠道规划
//!
//! 规则按顺序执行：
//! 1. 基础渠道集合来自用户开启的渠道，已删除的记录按默认偏好处理
//! 2. 集合为空且未强制发送：不派发，诊断为 "no channels enabled"
//! 3. 集合为空且强制发送：使用邮件，有手机号时加上短信
//! 4. `combined_only` / `require_all_channels`：预检各渠道模板（考虑语言回退）。
//!    要求全渠道时缺任何模板即不派发；仅 `combined_only` 时收缩到有模板的渠道
//!
//! 规划只依赖输入，不含随机性或时间依赖。

use std::borrow::Cow;

use notify_shared::models::{Channel, UserPreference};
use tracing::debug;

use crate::template::TemplateResolver;
use crate::types::{DispatchOptions, DispatchOutcome, REASON_NO_CHANNELS, REASON_TEMPLATES_UNAVAILABLE};

/// 规划结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanDecision {
    /// 按 `channels` 派发
    Dispatch,
    /// 用户未开启任何渠道
    OptedOut,
    /// 必需渠道缺少模板
    TemplatesUnavailable,
}

impl PlanDecision {
    /// 不派发时对应的收件人结论
    pub fn outcome(&self) -> Option<DispatchOutcome> {
        match self {
            Self::Dispatch => None,
            Self::OptedOut => Some(DispatchOutcome::OptedOut),
            Self::TemplatesUnavailable => Some(DispatchOutcome::TemplatesUnavailable),
        }
    }
}

/// 渠道规划结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPlan {
    pub channels: Vec<Channel>,
    pub decision: PlanDecision,
    pub reason: Option<String>,
    /// 强制发送覆盖了用户偏好
    pub preferences_overridden: bool,
    /// 因缺少模板被移出的渠道
    pub missing_templates: Vec<Channel>,
}

impl ChannelPlan {
    fn dispatch(channels: Vec<Channel>, preferences_overridden: bool) -> Self {
        Self {
            channels,
            decision: PlanDecision::Dispatch,
            reason: None,
            preferences_overridden,
            missing_templates: Vec::new(),
        }
    }

    fn blocked(decision: PlanDecision, reason: &str, preferences_overridden: bool) -> Self {
        Self {
            channels: Vec::new(),
            decision,
            reason: Some(reason.to_string()),
            preferences_overridden,
            missing_templates: Vec::new(),
        }
    }

    pub fn is_dispatchable(&self) -> bool {
        self.decision == PlanDecision::Dispatch
    }
}

/// 已删除的记录在逻辑上不存在，按首次出现的用户处理
pub fn effective_preference(preference: &UserPreference) -> Cow<'_, UserPreference> {
    if preference.is_deleted {
        Cow::Owned(UserPreference::new_default(preference.user_id.clone()))
    } else {
        Cow::Borrowed(preference)
    }
}

/// 渠道规划器
#[derive(Clone)]
pub struct ChannelPlanner {
    resolver: TemplateResolver,
}

impl ChannelPlanner {
    pub fn new(resolver: TemplateResolver) -> Self {
        Self { resolver }
    }

    pub fn plan(
        &self,
        preference: &UserPreference,
        notification_type: &str,
        options: &DispatchOptions,
    ) -> ChannelPlan {
        let preference = effective_preference(preference);
        let mut channels = preference.enabled_channels();
        let mut overridden = false;

        if channels.is_empty() {
            if !options.force_send {
                debug!(user_id = %preference.user_id, "用户未开启任何渠道");
                return ChannelPlan::blocked(PlanDecision::OptedOut, REASON_NO_CHANNELS, false);
            }

            // 覆盖偏好，但不伪造联系方式
            channels.push(Channel::Email);
            if preference.has_phone() {
                channels.push(Channel::Sms);
            }
            overridden = true;
        }

        if !options.tracks_combined_delivery() {
            return ChannelPlan::dispatch(channels, overridden);
        }

        let language = preference.preferred_language.as_str();
        let (available, missing): (Vec<Channel>, Vec<Channel>) = channels
            .into_iter()
            .partition(|channel| self.resolver.has_template(*channel, notification_type, language));

        if missing.is_empty() {
            return ChannelPlan::dispatch(available, overridden);
        }

        debug!(
            user_id = %preference.user_id,
            notification_type,
            missing = ?missing,
            "部分渠道缺少模板"
        );

        if options.require_all_channels || available.is_empty() {
            let mut plan = ChannelPlan::blocked(
                PlanDecision::TemplatesUnavailable,
                REASON_TEMPLATES_UNAVAILABLE,
                overridden,
            );
            plan.missing_templates = missing;
            return plan;
        }

        let mut plan = ChannelPlan::dispatch(available, overridden);
        plan.missing_templates = missing;
        plan
    }
}
