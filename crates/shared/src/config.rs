//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use std::collections::HashMap;
use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{NotifyError, Result};
use crate::observability::ObservabilityConfig;

/// 模板中未解析占位符的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPlaceholder {
    /// 保留 `{{name}}` 原样
    #[default]
    Keep,
    /// 从输出中移除
    Strip,
}

/// 模板配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// 首选语言缺失时的回退语言
    pub fallback_language: String,
    /// 严格模式下不做语言回退
    pub strict_language: bool,
    pub missing_placeholder: MissingPlaceholder,
    /// 系统级默认变量，优先级最低
    pub defaults: HashMap<String, String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        let defaults = HashMap::from([
            ("app_name".to_string(), "Notifier".to_string()),
            ("support_email".to_string(), "support@example.com".to_string()),
            ("name".to_string(), "there".to_string()),
        ]);

        Self {
            fallback_language: "en".to_string(),
            strict_language: false,
            missing_placeholder: MissingPlaceholder::Keep,
            defaults,
        }
    }
}

/// 投递配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// 模拟发送器的人工延迟（毫秒）
    pub mock_delay_ms: u64,
    /// 手机号去掉格式字符后的最少位数
    pub min_phone_digits: usize,
    pub email_from: String,
    pub sms_from: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            mock_delay_ms: 20,
            min_phone_digits: 10,
            email_from: "noreply@example.com".to_string(),
            sms_from: "+15550000000".to_string(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub observability: ObservabilityConfig,
    pub templates: TemplateConfig,
    pub delivery: DeliveryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "notification-router".to_string(),
            environment: "development".to_string(),
            observability: ObservabilityConfig::default(),
            templates: TemplateConfig::default(),
            delivery: DeliveryConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（NOTIFY_ 前缀，层级用双下划线，如
    ///    NOTIFY_TEMPLATES__FALLBACK_LANGUAGE -> templates.fallback_language）
    pub fn load(service_name: &str) -> Result<Self> {
        // .env 仅用于本地开发，不存在时忽略
        let _ = dotenvy::dotenv();

        let env = std::env::var("NOTIFY_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("NOTIFY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        // 可观测性配置沿用服务名，便于日志和指标按服务区分
        if config.observability.service_name.is_empty()
            || config.observability.service_name == ObservabilityConfig::default().service_name
        {
            config.observability.service_name = config.service_name.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// 校验加载后的配置
    pub fn validate(&self) -> Result<()> {
        if self.templates.fallback_language.trim().is_empty() {
            return Err(NotifyError::Validation(
                "templates.fallback_language 不能为空".to_string(),
            ));
        }
        if self.delivery.min_phone_digits == 0 {
            return Err(NotifyError::Validation(
                "delivery.min_phone_digits 必须大于 0".to_string(),
            ));
        }
        if self.delivery.email_from.trim().is_empty() || self.delivery.sms_from.trim().is_empty() {
            return Err(NotifyError::Validation("发件人标识不能为空".to_string()));
        }
        Ok(())
    }
}
