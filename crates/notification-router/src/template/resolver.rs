//! 模板解析
//!
//! 两步查找：先按首选语言精确匹配，缺失且首选语言不是回退语言时再尝试回退语言。
//! 不会在其他语言之间任意搜索。严格模式下不做回退。

use std::sync::Arc;

use notify_shared::config::TemplateConfig;
use notify_shared::models::{Channel, DEFAULT_LANGUAGE};
use tracing::debug;

use super::Template;
use super::store::TemplateProvider;
use crate::error::{NotificationError, Result};

/// 语言解析模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionMode {
    /// 首选语言缺失时回退到默认语言
    #[default]
    FallbackToDefault,
    /// 只接受首选语言
    Strict,
}

/// 解析出的模板及其实际语言
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub template: Template,
    pub language: String,
    pub fallback_used: bool,
}

/// 模板解析器
#[derive(Clone)]
pub struct TemplateResolver {
    provider: Arc<dyn TemplateProvider>,
    mode: ResolutionMode,
    fallback_language: String,
}

impl TemplateResolver {
    pub fn new(provider: Arc<dyn TemplateProvider>) -> Self {
        Self {
            provider,
            mode: ResolutionMode::FallbackToDefault,
            fallback_language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn from_config(provider: Arc<dyn TemplateProvider>, config: &TemplateConfig) -> Self {
        let mode = if config.strict_language {
            ResolutionMode::Strict
        } else {
            ResolutionMode::FallbackToDefault
        };

        Self::new(provider)
            .with_mode(mode)
            .with_fallback_language(&config.fallback_language)
    }

    pub fn with_mode(mut self, mode: ResolutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_fallback_language(mut self, language: &str) -> Self {
        let language = language.trim();
        if !language.is_empty() {
            self.fallback_language = language.to_string();
        }
        self
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    pub fn fallback_language(&self) -> &str {
        &self.fallback_language
    }

    /// 解析模板
    ///
    /// 首选语言为空时直接按回退语言查找，此时不计为回退。
    pub fn resolve(
        &self,
        channel: Channel,
        name: &str,
        preferred_language: &str,
    ) -> Option<ResolvedTemplate> {
        let preferred = match preferred_language.trim() {
            "" => self.fallback_language.as_str(),
            language => language,
        };

        if let Some(template) = self.provider.get(channel, name, preferred) {
            return Some(ResolvedTemplate {
                template,
                language: preferred.to_string(),
                fallback_used: false,
            });
        }

        if self.mode == ResolutionMode::Strict || preferred == self.fallback_language {
            debug!(%channel, template = name, language = preferred, "模板未找到");
            return None;
        }

        let template = self.provider.get(channel, name, &self.fallback_language)?;
        debug!(
            %channel,
            template = name,
            requested = preferred,
            actual = %self.fallback_language,
            "首选语言模板缺失，使用回退语言"
        );

        Some(ResolvedTemplate {
            template,
            language: self.fallback_language.clone(),
            fallback_used: true,
        })
    }

    /// 解析模板，找不到时返回 `TemplateNotFound`
    pub fn require(
        &self,
        channel: Channel,
        name: &str,
        preferred_language: &str,
    ) -> Result<ResolvedTemplate> {
        self.resolve(channel, name, preferred_language)
            .ok_or_else(|| NotificationError::TemplateNotFound {
                channel,
                template: name.to_string(),
                language: preferred_language.to_string(),
            })
    }

    /// 模板是否可用（考虑语言回退）
    pub fn has_template(&self, channel: Channel, name: &str, preferred_language: &str) -> bool {
        self.resolve(channel, name, preferred_language).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::InMemoryTemplateStore;

    fn english_only_store() -> Arc<InMemoryTemplateStore> {
        let store = InMemoryTemplateStore::new();
        store.upsert("welcome", "en", Template::email("Welcome", "Hello {{name}}"));
        Arc::new(store)
    }

    #[test]
    fn test_exact_match_no_fallback() {
        let resolver = TemplateResolver::new(english_only_store());
        let resolved = resolver.resolve(Channel::Email, "welcome", "en").unwrap();
        assert_eq!(resolved.language, "en");
        assert!(!resolved.fallback_used);
    }

    #[test]
    fn test_fallback_for_any_other_language() {
        let resolver = TemplateResolver::new(english_only_store());

        for language in ["fr", "de", "es", "zh-CN", "pt"] {
            let resolved = resolver.resolve(Channel::Email, "welcome", language).unwrap();
            assert_eq!(resolved.language, "en");
            assert!(resolved.fallback_used, "语言 {language} 应使用回退");
        }
    }

    #[test]
    fn test_preferred_language_wins_when_present() {
        let resolver = TemplateResolver::new(Arc::new(InMemoryTemplateStore::with_defaults()));
        let resolved = resolver.resolve(Channel::Email, "welcome", "fr").unwrap();
        assert_eq!(resolved.language, "fr");
        assert!(!resolved.fallback_used);
    }

    #[test]
    fn test_not_found_anywhere() {
        let resolver = TemplateResolver::new(english_only_store());
        assert!(resolver.resolve(Channel::Sms, "welcome", "fr").is_none());
        assert!(resolver.resolve(Channel::Email, "unknown", "en").is_none());
        assert!(!resolver.has_template(Channel::Sms, "welcome", "en"));
    }

    #[test]
    fn test_only_single_fallback_step() {
        // 只有西班牙语版本时，法语请求不能落到西班牙语
        let store = InMemoryTemplateStore::new();
        store.upsert("promo", "es", Template::sms("Oferta"));
        let resolver = TemplateResolver::new(Arc::new(store));

        assert!(resolver.resolve(Channel::Sms, "promo", "fr").is_none());
        assert!(resolver.resolve(Channel::Sms, "promo", "es").is_some());
    }

    #[test]
    fn test_strict_mode_disables_fallback() {
        let resolver =
            TemplateResolver::new(english_only_store()).with_mode(ResolutionMode::Strict);
        assert!(resolver.resolve(Channel::Email, "welcome", "fr").is_none());
        assert!(resolver.resolve(Channel::Email, "welcome", "en").is_some());
    }

    #[test]
    fn test_require_reports_template_not_found() {
        let resolver = TemplateResolver::new(english_only_store());
        assert!(resolver.require(Channel::Email, "welcome", "fr").is_ok());

        let err = resolver.require(Channel::Sms, "welcome", "fr").unwrap_err();
        assert!(matches!(
            err,
            NotificationError::TemplateNotFound { channel: Channel::Sms, ref template, ref language }
                if template == "welcome" && language == "fr"
        ));
    }

    #[test]
    fn test_empty_language_uses_fallback_directly() {
        let resolver = TemplateResolver::new(english_only_store());
        let resolved = resolver.resolve(Channel::Email, "welcome", "  ").unwrap();
        assert_eq!(resolved.language, "en");
        assert!(!resolved.fallback_used);
    }

    #[test]
    fn test_from_config() {
        let config = TemplateConfig {
            strict_language: true,
            fallback_language: "fr".to_string(),
            ..Default::default()
        };
        let resolver =
            TemplateResolver::from_config(Arc::new(InMemoryTemplateStore::new()), &config);
        assert_eq!(resolver.mode(), ResolutionMode::Strict);
        assert_eq!(resolver.fallback_language(), "fr");
    }
}
