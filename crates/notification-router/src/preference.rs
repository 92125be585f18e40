//! 用户偏好提供方
//!
//! 派发路径只通过 `PreferenceProvider` 读取偏好。首次出现或已软删除的用户
//! 不视为错误，而是返回合成的默认偏好，规划器因此可以统一处理
//! “没有记录”和“已退订”两种情况。

use async_trait::async_trait;
use dashmap::DashMap;
use notify_shared::models::{PreferenceUpdate, UserPreference};
use tracing::{debug, info};

use crate::error::Result;

/// 用户偏好提供方
///
/// 返回的偏好是调用时的只读快照，路由核心不会回写。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreferenceProvider: Send + Sync {
    async fn get_preferences(&self, user_id: &str) -> Result<UserPreference>;
}

/// 基于并发哈希表的内存偏好存储
#[derive(Debug, Default)]
pub struct InMemoryPreferenceStore {
    preferences: DashMap<String, UserPreference>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用给定记录构造存储，常用于测试夹具和 CLI 加载
    pub fn preferences_for(records: impl IntoIterator<Item = UserPreference>) -> Self {
        let store = Self::new();
        for record in records {
            store.preferences.insert(record.user_id.clone(), record);
        }
        store
    }

    /// 新增或部分更新用户偏好
    ///
    /// 记录不存在或已软删除时以默认偏好为基础应用更新。
    pub fn upsert_preferences(&self, user_id: &str, update: PreferenceUpdate) -> UserPreference {
        let mut entry = self
            .preferences
            .entry(user_id.to_string())
            .or_insert_with(|| UserPreference::new_default(user_id));

        if entry.is_deleted {
            *entry = UserPreference::new_default(user_id);
        }
        entry.apply(update);

        debug!(user_id, "用户偏好已更新");
        entry.clone()
    }

    /// 软删除用户偏好，返回记录是否存在
    pub fn delete_preferences(&self, user_id: &str) -> bool {
        match self.preferences.get_mut(user_id) {
            Some(mut record) if !record.is_deleted => {
                record.is_deleted = true;
                record.updated_at = chrono::Utc::now();
                info!(user_id, "用户偏好已软删除");
                true
            }
            _ => false,
        }
    }

    /// 是否存在未删除的记录
    pub fn contains(&self, user_id: &str) -> bool {
        self.preferences
            .get(user_id)
            .is_some_and(|record| !record.is_deleted)
    }

    pub fn len(&self) -> usize {
        self.preferences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preferences.is_empty()
    }
}

#[async_trait]
impl PreferenceProvider for InMemoryPreferenceStore {
    async fn get_preferences(&self, user_id: &str) -> Result<UserPreference> {
        if let Some(record) = self.preferences.get(user_id)
            && !record.is_deleted
        {
            return Ok(record.clone());
        }

        // 首次出现或已删除：合成默认偏好并存储
        let record = UserPreference::new_default(user_id);
        self.preferences.insert(user_id.to_string(), record.clone());
        debug!(user_id, "为首次出现的用户创建默认偏好");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify_shared::models::Channel;
    use notify_shared::test_utils::TestDataGenerator;

    #[tokio::test]
    async fn test_first_time_user_gets_defaults() {
        let store = InMemoryPreferenceStore::new();
        assert!(!store.contains("new@example.com"));

        let pref = store.get_preferences("new@example.com").await.unwrap();
        assert_eq!(pref.enabled_channels(), vec![Channel::Email]);
        assert_eq!(pref.preferred_language, "en");

        // 默认偏好作为副作用被存储
        assert!(store.contains("new@example.com"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_existing_record_returned() {
        let store = InMemoryPreferenceStore::preferences_for([TestDataGenerator::sms_only("u1")]);
        let pref = tokio_test::block_on(store.get_preferences("u1")).unwrap();
        assert_eq!(pref.enabled_channels(), vec![Channel::Sms]);
    }

    #[tokio::test]
    async fn test_deleted_record_replaced_by_defaults() {
        let store = InMemoryPreferenceStore::preferences_for([TestDataGenerator::deleted("u1")]);
        assert!(!store.contains("u1"));

        let pref = store.get_preferences("u1").await.unwrap();
        assert!(!pref.is_deleted);
        assert!(pref.phone.is_none());
        assert_eq!(pref.enabled_channels(), vec![Channel::Email]);
    }

    #[test]
    fn test_upsert_and_soft_delete() {
        let store = InMemoryPreferenceStore::new();
        let pref = store.upsert_preferences(
            "u1",
            PreferenceUpdate {
                sms_enabled: Some(true),
                phone: Some("+1 555 010 2030".to_string()),
                preferred_language: Some("fr".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(pref.enabled_channels(), vec![Channel::Email, Channel::Sms]);
        assert_eq!(pref.preferred_language, "fr");

        assert!(store.delete_preferences("u1"));
        assert!(!store.delete_preferences("u1"));
        assert!(!store.delete_preferences("missing"));

        // 删除后再次更新从默认偏好开始
        let pref = store.upsert_preferences(
            "u1",
            PreferenceUpdate {
                name: Some("Ana".to_string()),
                ..Default::default()
            },
        );
        assert!(!pref.sms_enabled);
        assert_eq!(pref.name.as_deref(), Some("Ana"));
        assert_eq!(pref.preferred_language, "en");
    }
}
