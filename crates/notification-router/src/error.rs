//! 通知路由错误类型
//!
//! 定义渠道发送、模板解析渲染、偏好读取等协作方边界上的错误分类。
//! 这些错误不会穿透公共派发入口：派发执行器会将其转换为 `ChannelResult.error`
//! 或 `DispatchResult.reason`。

use notify_shared::models::Channel;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("通知发送失败: 渠道={channel}, 原因={reason}")]
    SendFailed { channel: Channel, reason: String },

    #[error("通知模板未找到: {channel}.{template}.{language}")]
    TemplateNotFound {
        channel: Channel,
        template: String,
        language: String,
    },

    /// 模板既不是字符串也不是对象，属于调用方的编程错误
    #[error("无效的模板类型: {0}")]
    InvalidTemplate(String),

    /// 文本直接作为渠道结果的错误信息
    #[error("Invalid {channel} format")]
    InvalidAddress { channel: Channel },

    #[error("用户偏好读取失败: user_id={user_id}, 原因={reason}")]
    PreferenceUnavailable { user_id: String, reason: String },

    #[error("渠道未注册发送器: {0}")]
    SenderNotRegistered(Channel),

    #[error("请求无效: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Shared(#[from] notify_shared::error::NotifyError),
}

pub type Result<T> = std::result::Result<T, NotificationError>;
