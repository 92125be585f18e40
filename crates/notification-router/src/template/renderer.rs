//! 模板渲染
//!
//! 将 `{{name}}` 占位符替换为数据中的值。查找顺序：请求数据 → 默认变量表，
//! 两处都没有时按配置保留原样或移除。渲染对任意数据都不会失败。

use std::collections::HashMap;
use std::sync::LazyLock;

use notify_shared::config::{MissingPlaceholder, TemplateConfig};
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use super::{RenderedContent, Template};
use crate::error::{NotificationError, Result};

/// 占位符语法：名称为不含花括号和空白的任意字符，两侧允许空白
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").unwrap());

/// 模板渲染器
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    defaults: HashMap<String, String>,
    missing: MissingPlaceholder,
}

impl TemplateRenderer {
    pub fn new(defaults: HashMap<String, String>, missing: MissingPlaceholder) -> Self {
        Self { defaults, missing }
    }

    pub fn from_config(config: &TemplateConfig) -> Self {
        Self::new(config.defaults.clone(), config.missing_placeholder)
    }

    pub fn with_missing(mut self, missing: MissingPlaceholder) -> Self {
        self.missing = missing;
        self
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    pub fn defaults(&self) -> &HashMap<String, String> {
        &self.defaults
    }

    /// 渲染渠道模板
    pub fn render(&self, template: &Template, data: &Map<String, Value>) -> RenderedContent {
        match template {
            Template::Email { subject, body } => RenderedContent::Email {
                subject: self.render_str(subject, data),
                body: self.render_str(body, data),
            },
            Template::Sms { body } => RenderedContent::Sms {
                body: self.render_str(body, data),
            },
        }
    }

    /// 渲染单个字符串模板
    pub fn render_str(&self, template: &str, data: &Map<String, Value>) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| {
                let name = &caps[1];
                match self.lookup(name, data) {
                    Some(value) => value,
                    None => match self.missing {
                        MissingPlaceholder::Keep => caps[0].to_string(),
                        MissingPlaceholder::Strip => String::new(),
                    },
                }
            })
            .into_owned()
    }

    /// 渲染任意 JSON 形状的模板
    ///
    /// 字符串模板直接渲染；对象模板逐个渲染字符串字段，其余字段原样保留。
    /// 其他类型返回 `InvalidTemplate`。
    pub fn render_value(&self, template: &Value, data: &Map<String, Value>) -> Result<Value> {
        match template {
            Value::String(text) => Ok(Value::String(self.render_str(text, data))),
            Value::Object(fields) => {
                let rendered = fields
                    .iter()
                    .map(|(key, value)| {
                        let value = match value {
                            Value::String(text) => Value::String(self.render_str(text, data)),
                            other => other.clone(),
                        };
                        (key.clone(), value)
                    })
                    .collect();
                Ok(Value::Object(rendered))
            }
            other => Err(NotificationError::InvalidTemplate(
                json_type_name(other).to_string(),
            )),
        }
    }

    /// 文本中引用的占位符名，按首次出现顺序去重
    pub fn extract_placeholders(text: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(text) {
            let name = &caps[1];
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    /// 模板（含邮件主题）引用的全部占位符
    pub fn template_placeholders(template: &Template) -> Vec<String> {
        let mut names = match template {
            Template::Email { subject, .. } => Self::extract_placeholders(subject),
            Template::Sms { .. } => Vec::new(),
        };
        for name in Self::extract_placeholders(template.body()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// 数据和默认变量都无法提供的占位符
    pub fn missing_placeholders(&self, template: &Template, data: &Map<String, Value>) -> Vec<String> {
        Self::template_placeholders(template)
            .into_iter()
            .filter(|name| self.lookup(name, data).is_none())
            .collect()
    }

    fn lookup(&self, name: &str, data: &Map<String, Value>) -> Option<String> {
        data.get(name)
            .and_then(stringify)
            .or_else(|| self.defaults.get(name).cloned())
    }
}

/// 数据值转为替换文本，`null` 视为缺失
fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        // 数组和对象以 JSON 文本输出
        other => Some(other.to_string()),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
