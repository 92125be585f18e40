//! 测试工具模块
//!
//! 提供测试所需的辅助函数和测试数据生成器，用于简化测试代码编写，
//! 提高测试的可重复性和可维护性。

use chrono::{Duration, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::config::{AppConfig, DeliveryConfig};
use crate::models::UserPreference;

// ==================== 测试配置辅助 ====================

/// 创建测试用应用配置
///
/// 模拟发送延迟设为 0，避免测试等待
pub fn test_app_config() -> AppConfig {
    AppConfig {
        service_name: "notification-router-test".to_string(),
        environment: "test".to_string(),
        delivery: DeliveryConfig {
            mock_delay_ms: 0,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// 生成唯一的测试用户 ID
pub fn test_user_id() -> String {
    format!("test-user-{}", Uuid::new_v4())
}

/// 生成唯一的测试邮箱，可直接作为首次用户的 user_id
pub fn test_email() -> String {
    format!("user-{}@example.com", Uuid::new_v4().simple())
}

// ==================== 测试数据生成器 ====================

/// 测试数据生成器
///
/// 提供生成测试用用户偏好、通知数据的便捷方法
pub struct TestDataGenerator;

impl TestDataGenerator {
    /// 同时开启邮件和短信、联系方式齐全的用户
    pub fn preference(user_id: &str) -> UserPreference {
        UserPreference::new_default(user_id)
            .with_channels(true, true)
            .with_email(format!("{user_id}@example.com"))
            .with_phone("+1 (555) 010-2030")
            .with_name("Test User")
    }

    /// 只开启邮件的用户
    pub fn email_only(user_id: &str) -> UserPreference {
        Self::preference(user_id).with_channels(true, false)
    }

    /// 只开启短信的用户
    pub fn sms_only(user_id: &str) -> UserPreference {
        Self::preference(user_id).with_channels(false, true)
    }

    /// 关闭所有渠道的用户
    pub fn opted_out(user_id: &str) -> UserPreference {
        Self::preference(user_id).with_channels(false, false)
    }

    /// 关闭所有渠道且没有手机号的用户
    pub fn opted_out_without_phone(user_id: &str) -> UserPreference {
        let mut pref = Self::opted_out(user_id);
        pref.phone = None;
        pref
    }

    /// 已软删除的用户记录
    pub fn deleted(user_id: &str) -> UserPreference {
        let mut pref = Self::preference(user_id);
        pref.is_deleted = true;
        pref.updated_at = Utc::now() + Duration::seconds(1);
        pref
    }

    /// 指定首选语言的用户
    pub fn with_language(user_id: &str, language: &str) -> UserPreference {
        Self::preference(user_id).with_language(language)
    }

    /// 邮箱格式非法的用户
    pub fn invalid_email(user_id: &str) -> UserPreference {
        Self::email_only(user_id).with_email("not-an-email")
    }

    /// 手机号过短的用户
    pub fn invalid_phone(user_id: &str) -> UserPreference {
        Self::sms_only(user_id).with_phone("12345")
    }

    /// 欢迎通知的动态数据
    pub fn welcome_data(name: &str) -> Value {
        json!({
            "name": name,
            "activation_link": "https://example.com/activate/abc123",
        })
    }

    /// 订单确认通知的动态数据，包含数值类型
    pub fn order_data(order_id: &str, total: f64) -> Value {
        json!({
            "order_id": order_id,
            "total": total,
            "items": 3,
            "express": true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Channel;

    #[test]
    fn test_unique_ids() {
        assert_ne!(test_user_id(), test_user_id());
        assert!(test_email().ends_with("@example.com"));
    }

    #[test]
    fn test_generator_channels() {
        assert_eq!(
            TestDataGenerator::preference("u").enabled_channels(),
            vec![Channel::Email, Channel::Sms]
        );
        assert_eq!(
            TestDataGenerator::sms_only("u").enabled_channels(),
            vec![Channel::Sms]
        );
        assert!(TestDataGenerator::opted_out("u").enabled_channels().is_empty());
        assert!(TestDataGenerator::deleted("u").enabled_channels().is_empty());
    }
}
