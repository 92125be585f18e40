//! 模板存储
//!
//! `TemplateProvider` 是派发路径上唯一依赖的只读查找接口；
//! 新增、更新、删除模板属于管理操作，只在具体存储类型上提供。

use dashmap::DashMap;
use notify_shared::models::Channel;
use tracing::debug;

use super::Template;

/// 模板提供方
///
/// 纯查找，无副作用。未找到返回 `None`，不视为错误。
pub trait TemplateProvider: Send + Sync {
    fn get(&self, channel: Channel, name: &str, language: &str) -> Option<Template>;
}

/// 模板主键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TemplateKey {
    channel: Channel,
    name: String,
    language: String,
}

impl TemplateKey {
    fn new(channel: Channel, name: &str, language: &str) -> Self {
        Self {
            channel,
            name: name.to_string(),
            language: language.to_string(),
        }
    }
}

/// 基于并发哈希表的内存模板存储
#[derive(Debug, Default)]
pub struct InMemoryTemplateStore {
    templates: DashMap<TemplateKey, Template>,
}

impl InMemoryTemplateStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带有内置模板的存储
    pub fn with_defaults() -> Self {
        let store = Self::new();
        store.register_default_templates();
        store
    }

    /// 注册内置模板
    ///
    /// 每个模板名都有英文版本作为最终回退。
    fn register_default_templates(&self) {
        // 欢迎通知
        self.upsert(
            "welcome",
            "en",
            Template::email(
                "Welcome to {{app_name}}, {{name}}!",
                "Hi {{name}},\n\nThanks for joining {{app_name}}. Activate your account here: {{activation_link}}\n\nQuestions? Reach us at {{support_email}}.",
            ),
        );
        self.upsert(
            "welcome",
            "fr",
            Template::email(
                "Bienvenue sur {{app_name}}, {{name}} !",
                "Bonjour {{name}},\n\nMerci de nous avoir rejoints. Activez votre compte ici : {{activation_link}}",
            ),
        );
        self.upsert(
            "welcome",
            "es",
            Template::email(
                "¡Bienvenido a {{app_name}}, {{name}}!",
                "Hola {{name}},\n\nGracias por unirte. Activa tu cuenta aquí: {{activation_link}}",
            ),
        );
        self.upsert(
            "welcome",
            "en",
            Template::sms("Welcome to {{app_name}}, {{name}}! Activate: {{activation_link}}"),
        );
        self.upsert(
            "welcome",
            "es",
            Template::sms("¡Bienvenido a {{app_name}}, {{name}}! Activa: {{activation_link}}"),
        );

        // 重置密码
        self.upsert(
            "password_reset",
            "en",
            Template::email(
                "Reset your {{app_name}} password",
                "Hi {{name}},\n\nUse this code to reset your password: {{reset_code}}. It expires in {{expires_minutes}} minutes.",
            ),
        );
        self.upsert(
            "password_reset",
            "fr",
            Template::email(
                "Réinitialisez votre mot de passe {{app_name}}",
                "Bonjour {{name}},\n\nVotre code de réinitialisation : {{reset_code}}. Il expire dans {{expires_minutes}} minutes.",
            ),
        );
        self.upsert(
            "password_reset",
            "en",
            Template::sms("{{app_name}} reset code: {{reset_code}} (valid {{expires_minutes}} min)"),
        );

        // 订单确认
        self.upsert(
            "order_confirmation",
            "en",
            Template::email(
                "Order {{order_id}} confirmed",
                "Hi {{name}},\n\nWe received your order {{order_id}} of {{items}} item(s), total {{total}}.",
            ),
        );
        self.upsert(
            "order_confirmation",
            "en",
            Template::sms("Order {{order_id}} confirmed. Total: {{total}}"),
        );

        // 账户告警，仅邮件
        self.upsert(
            "account_alert",
            "en",
            Template::email(
                "Security alert for your {{app_name}} account",
                "Hi {{name}},\n\nWe noticed {{event}}. If this wasn't you, contact {{support_email}}.",
            ),
        );
    }

    /// 新增或覆盖模板，渠道由模板本身决定
    pub fn upsert(&self, name: &str, language: &str, template: Template) -> Option<Template> {
        let key = TemplateKey::new(template.channel(), name, language);
        debug!(
            channel = %key.channel,
            template = name,
            language,
            "注册通知模板"
        );
        self.templates.insert(key, template)
    }

    /// 删除模板
    pub fn remove(&self, channel: Channel, name: &str, language: &str) -> Option<Template> {
        self.templates
            .remove(&TemplateKey::new(channel, name, language))
            .map(|(_, template)| template)
    }

    /// 某个模板已有的语言，按字母排序
    pub fn languages(&self, channel: Channel, name: &str) -> Vec<String> {
        let mut languages: Vec<String> = self
            .templates
            .iter()
            .filter(|entry| entry.key().channel == channel && entry.key().name == name)
            .map(|entry| entry.key().language.clone())
            .collect();
        languages.sort();
        languages
    }

    /// 某个渠道下的全部模板名，去重后排序
    pub fn template_names(&self, channel: Channel) -> Vec<String> {
        let mut names: Vec<String> = self
            .templates
            .iter()
            .filter(|entry| entry.key().channel == channel)
            .map(|entry| entry.key().name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateProvider for InMemoryTemplateStore {
    fn get(&self, channel: Channel, name: &str, language: &str) -> Option<Template> {
        self.templates
            .get(&TemplateKey::new(channel, name, language))
            .map(|entry| entry.value().clone())
    }
}
