//! 收件地址校验

use std::sync::LazyLock;

use notify_shared::models::Channel;
use regex::Regex;

use crate::error::{NotificationError, Result};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// 手机号允许出现的格式字符
const PHONE_FORMATTING: [char; 6] = ['+', '-', '(', ')', ' ', '.'];

/// 渠道地址校验器
#[derive(Debug, Clone, Copy)]
pub struct AddressValidator {
    min_phone_digits: usize,
}

impl Default for AddressValidator {
    fn default() -> Self {
        Self {
            min_phone_digits: 10,
        }
    }
}

impl AddressValidator {
    pub fn new(min_phone_digits: usize) -> Self {
        Self { min_phone_digits }
    }

    /// 校验渠道地址，缺失或格式不符时返回 `InvalidAddress`
    pub fn validate<'a>(&self, channel: Channel, address: Option<&'a str>) -> Result<&'a str> {
        match address {
            Some(address) if self.is_valid(channel, address) => Ok(address),
            _ => Err(NotificationError::InvalidAddress { channel }),
        }
    }

    pub fn is_valid(&self, channel: Channel, address: &str) -> bool {
        match channel {
            Channel::Email => is_valid_email(address),
            Channel::Sms => self.is_valid_phone(address),
        }
    }

    /// 去掉格式字符后必须全为数字且不少于最小位数
    pub fn is_valid_phone(&self, phone: &str) -> bool {
        let digits: String = phone
            .chars()
            .filter(|c| !PHONE_FORMATTING.contains(c))
            .collect();

        digits.len() >= self.min_phone_digits && digits.chars().all(|c| c.is_ascii_digit())
    }
}

/// 按原样校验，不做首尾空白裁剪
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}
