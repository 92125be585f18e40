//! test_utils 模块的集成测试
//!
//! 验证测试工具模块的功能正确性

use notify_shared::models::Channel;
use notify_shared::test_utils::*;

// ==================== 测试配置辅助测试 ====================

#[test]
fn test_app_config_disables_mock_delay() {
    let config = test_app_config();
    assert_eq!(config.delivery.mock_delay_ms, 0);
    assert_eq!(config.environment, "test");
    assert_eq!(config.templates.fallback_language, "en");
}

// ==================== 测试数据生成器测试 ====================

#[test]
fn test_preference_generation() {
    let pref = TestDataGenerator::preference("alice");
    assert_eq!(pref.user_id, "alice");
    assert_eq!(pref.email.as_deref(), Some("alice@example.com"));
    assert!(pref.has_phone());
    assert_eq!(pref.name.as_deref(), Some("Test User"));
    assert_eq!(pref.preferred_language, "en");
}

#[test]
fn test_opted_out_without_phone_generation() {
    let pref = TestDataGenerator::opted_out_without_phone("bob");
    assert!(!pref.email_enabled);
    assert!(!pref.sms_enabled);
    assert!(!pref.has_phone());
}

#[test]
fn test_language_preference_generation() {
    let pref = TestDataGenerator::with_language("carol", "fr");
    assert_eq!(pref.preferred_language, "fr");
    assert_eq!(pref.enabled_channels(), vec![Channel::Email, Channel::Sms]);
}

#[test]
fn test_invalid_contact_generation() {
    let bad_email = TestDataGenerator::invalid_email("dave");
    assert_eq!(bad_email.email_address(), "not-an-email");
    assert_eq!(bad_email.enabled_channels(), vec![Channel::Email]);

    let bad_phone = TestDataGenerator::invalid_phone("erin");
    assert_eq!(bad_phone.phone.as_deref(), Some("12345"));
    assert_eq!(bad_phone.enabled_channels(), vec![Channel::Sms]);
}

#[test]
fn test_deleted_generation() {
    let pref = TestDataGenerator::deleted("frank");
    assert!(pref.is_deleted);
    assert!(pref.updated_at >= pref.created_at);
}

// ==================== 通知数据生成器测试 ====================

#[test]
fn test_welcome_data_generation() {
    let data = TestDataGenerator::welcome_data("Grace");
    assert_eq!(data["name"], "Grace");
    assert!(data["activation_link"].as_str().unwrap().starts_with("https://"));
}

#[test]
fn test_order_data_generation() {
    let data = TestDataGenerator::order_data("ORD-1", 42.5);
    assert_eq!(data["order_id"], "ORD-1");
    assert_eq!(data["total"], 42.5);
    assert_eq!(data["items"], 3);
    assert_eq!(data["express"], true);
}
