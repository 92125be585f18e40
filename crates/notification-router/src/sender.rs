//! 渠道发送器
//!
//! 通过 `ChannelSender` trait 抽象单个渠道的物理投递，邮件与短信各自一个实例。
//! 当前提供模拟实现 `SimulatedSender`：可配置人工延迟、失败地址，并记录所有
//! 已接受的消息，便于在无外部依赖的情况下验证派发管道。接入真实服务商时只需实现同一 trait。

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notify_shared::config::DeliveryConfig;
use notify_shared::models::Channel;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{NotificationError, Result};
use crate::template::RenderedContent;

/// 发送附带的元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMetadata {
    pub recipient_id: String,
    pub notification_type: String,
    pub language: String,
    /// 发件人标识：邮件为发件地址，短信为发送号码
    pub from: String,
}

/// 各渠道的发件人标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderIdentity {
    email_from: String,
    sms_from: String,
}

impl SenderIdentity {
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self {
            email_from: config.email_from.clone(),
            sms_from: config.sms_from.clone(),
        }
    }

    pub fn for_channel(&self, channel: Channel) -> &str {
        match channel {
            Channel::Email => &self.email_from,
            Channel::Sms => &self.sms_from,
        }
    }
}

impl Default for SenderIdentity {
    fn default() -> Self {
        Self::from_config(&DeliveryConfig::default())
    }
}

/// 服务商受理回执
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    /// 外部渠道返回的消息标识，用于追踪投递状态
    pub message_id: String,
    pub status: String,
}

/// 渠道发送器
///
/// 失败以 `Err` 返回，派发执行器会将其写入对应渠道的 `ChannelResult.error`。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// 该发送器负责的渠道
    fn channel(&self) -> Channel;

    /// 发送渲染后的内容到指定地址
    async fn send(
        &self,
        address: &str,
        content: &RenderedContent,
        metadata: &SendMetadata,
    ) -> Result<SendReceipt>;
}

// ---------------------------------------------------------------------------
// 发送器注册表
// ---------------------------------------------------------------------------

/// 按渠道注册的发送器集合
#[derive(Clone, Default)]
pub struct ChannelSenders {
    senders: BTreeMap<Channel, Arc<dyn ChannelSender>>,
}

impl ChannelSenders {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册发送器，同一渠道后注册的覆盖先注册的
    pub fn register(mut self, sender: Arc<dyn ChannelSender>) -> Self {
        self.senders.insert(sender.channel(), sender);
        self
    }

    /// 邮件与短信的模拟发送器
    pub fn simulated(config: &DeliveryConfig) -> Self {
        let delay = Duration::from_millis(config.mock_delay_ms);
        Self::new()
            .register(Arc::new(SimulatedSender::new(Channel::Email).with_delay(delay)))
            .register(Arc::new(SimulatedSender::new(Channel::Sms).with_delay(delay)))
    }

    pub fn get(&self, channel: Channel) -> Result<Arc<dyn ChannelSender>> {
        self.senders
            .get(&channel)
            .cloned()
            .ok_or(NotificationError::SenderNotRegistered(channel))
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.senders.keys().copied().collect()
    }
}

// ---------------------------------------------------------------------------
// 模拟发送器
// ---------------------------------------------------------------------------

/// 模拟发送器接受的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: String,
    pub address: String,
    pub content: RenderedContent,
    pub metadata: SendMetadata,
}

/// 模拟渠道发送器
///
/// 生产环境中替换为 SMTP / 短信服务商的 API 调用
pub struct SimulatedSender {
    channel: Channel,
    delay: Duration,
    fail_all: bool,
    failing_addresses: HashSet<String>,
    sent: Mutex<Vec<SentMessage>>,
}

impl SimulatedSender {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            delay: Duration::ZERO,
            fail_all: false,
            failing_addresses: HashSet::new(),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// 每次发送前的人工延迟，模拟网络往返
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 所有发送均失败
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// 发往指定地址时失败
    pub fn fail_for(mut self, address: impl Into<String>) -> Self {
        self.failing_addresses.insert(address.into());
        self
    }

    /// 已接受的消息快照
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl ChannelSender for SimulatedSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(
        &self,
        address: &str,
        content: &RenderedContent,
        metadata: &SendMetadata,
    ) -> Result<SendReceipt> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail_all || self.failing_addresses.contains(address) {
            warn!(
                channel = %self.channel,
                recipient_id = %metadata.recipient_id,
                address,
                "模拟发送失败"
            );
            return Err(NotificationError::SendFailed {
                channel: self.channel,
                reason: format!("provider rejected message to {address}"),
            });
        }

        let message_id = format!("{}-{}", self.channel, Uuid::now_v7());

        info!(
            channel = %self.channel,
            recipient_id = %metadata.recipient_id,
            from = %metadata.from,
            notification_type = %metadata.notification_type,
            language = %metadata.language,
            message_id = %message_id,
            subject = content.subject().unwrap_or_default(),
            "模拟发送通知"
        );

        self.sent.lock().push(SentMessage {
            message_id: message_id.clone(),
            address: address.to_string(),
            content: content.clone(),
            metadata: metadata.clone(),
        });

        Ok(SendReceipt {
            message_id,
            status: "accepted".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
