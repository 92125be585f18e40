//! 渠道与用户偏好模型
//!
//! 定义通知投递渠道的枚举以及用户通知偏好记录。用户偏好由外部偏好存储持有，
//! 路由核心只读取不修改。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

// ---------------------------------------------------------------------------
// Channel: 投递渠道
// ---------------------------------------------------------------------------

/// 通知投递渠道
///
/// 排序固定为 Email 在前、Sms 在后，渠道集合与结果映射因此有确定的输出顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
}

impl Channel {
    /// 全部渠道，按规划顺序排列
    pub const ALL: [Channel; 2] = [Channel::Email, Channel::Sms];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            other => Err(NotifyError::InvalidArgument {
                field: "channel".to_string(),
                message: format!("未知渠道: {other}"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// UserPreference: 用户通知偏好
// ---------------------------------------------------------------------------

/// 默认语言
pub const DEFAULT_LANGUAGE: &str = "en";

/// 用户通知偏好
///
/// `user_id` 唯一标识一条记录；`is_deleted` 为 true 的记录在逻辑上视为不存在，
/// 不能作为渠道规划的依据。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreference {
    pub user_id: String,
    pub email_enabled: bool,
    pub sms_enabled: bool,
    #[serde(default = "default_language")]
    pub preferred_language: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl UserPreference {
    /// 首次出现的用户使用的合成默认偏好：仅开启邮件，语言为英文
    pub fn new_default(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            email_enabled: true,
            sms_enabled: false,
            preferred_language: default_language(),
            email: None,
            phone: None,
            name: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.preferred_language = language.into();
        self
    }

    pub fn with_channels(mut self, email_enabled: bool, sms_enabled: bool) -> Self {
        self.email_enabled = email_enabled;
        self.sms_enabled = sms_enabled;
        self
    }

    /// 邮件收件地址：优先使用记录中的邮箱，没有时退回 user_id
    ///
    /// 首次出现的用户通常以邮箱作为 user_id。
    pub fn email_address(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.user_id).trim()
    }

    /// 指定渠道的收件地址，已去掉首尾空白
    pub fn address_for(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Email => Some(self.email_address()),
            Channel::Sms => self.phone.as_deref().map(str::trim),
        }
    }

    /// 记录中是否有可用的手机号
    pub fn has_phone(&self) -> bool {
        self.phone.as_deref().is_some_and(|p| !p.trim().is_empty())
    }

    /// 用户开启的渠道，已删除的记录不开启任何渠道
    pub fn enabled_channels(&self) -> Vec<Channel> {
        if self.is_deleted {
            return Vec::new();
        }

        Channel::ALL
            .into_iter()
            .filter(|channel| match channel {
                Channel::Email => self.email_enabled,
                Channel::Sms => self.sms_enabled,
            })
            .collect()
    }

    /// 应用部分更新并刷新 `updated_at`
    pub fn apply(&mut self, update: PreferenceUpdate) {
        if let Some(v) = update.email_enabled {
            self.email_enabled = v;
        }
        if let Some(v) = update.sms_enabled {
            self.sms_enabled = v;
        }
        if let Some(v) = update.preferred_language {
            self.preferred_language = v;
        }
        if let Some(v) = update.email {
            self.email = Some(v);
        }
        if let Some(v) = update.phone {
            self.phone = Some(v);
        }
        if let Some(v) = update.name {
            self.name = Some(v);
        }
        self.is_deleted = false;
        self.updated_at = Utc::now();
    }
}

/// 偏好的部分更新，未给出的字段保持不变
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceUpdate {
    pub email_enabled: Option<bool>,
    pub sms_enabled: Option<bool>,
    pub preferred_language: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
}
