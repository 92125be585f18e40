//! 通知模板
//!
//! 模板按 (渠道, 模板名, 语言) 存储：邮件模板包含主题和正文，短信模板只有正文。
//!
//! - `store`：模板提供方 trait 与内存实现
//! - `resolver`：按首选语言解析模板，缺失时回退到默认语言
//! - `renderer`：`{{placeholder}}` 变量替换

pub mod renderer;
pub mod resolver;
pub mod store;

use notify_shared::models::Channel;
use serde::{Deserialize, Serialize};

pub use renderer::TemplateRenderer;
pub use resolver::{ResolutionMode, ResolvedTemplate, TemplateResolver};
pub use store::{InMemoryTemplateStore, TemplateProvider};

/// 渠道模板
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "lowercase")]
pub enum Template {
    Email { subject: String, body: String },
    Sms { body: String },
}

impl Template {
    pub fn email(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Email {
            subject: subject.into(),
            body: body.into(),
        }
    }

    pub fn sms(body: impl Into<String>) -> Self {
        Self::Sms { body: body.into() }
    }

    /// 模板所属渠道
    pub fn channel(&self) -> Channel {
        match self {
            Self::Email { .. } => Channel::Email,
            Self::Sms { .. } => Channel::Sms,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Self::Email { body, .. } | Self::Sms { body } => body,
        }
    }
}

/// 渲染后的内容，形状与模板一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "lowercase")]
pub enum RenderedContent {
    Email { subject: String, body: String },
    Sms { body: String },
}

impl RenderedContent {
    pub fn channel(&self) -> Channel {
        match self {
            Self::Email { .. } => Channel::Email,
            Self::Sms { .. } => Channel::Sms,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Email { subject, .. } => Some(subject),
            Self::Sms { .. } => None,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Self::Email { body, .. } | Self::Sms { body } => body,
        }
    }
}
