//! 命令执行器
//!
//! 将命令行参数转化为派发引擎调用，结果以格式化 JSON 打印到标准输出。

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use notify_shared::config::AppConfig;
use notify_shared::models::{Channel, UserPreference};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::commands::DeliveryFlags;
use crate::batch::BatchOrchestrator;
use crate::dispatcher::DispatchExecutor;
use crate::preference::InMemoryPreferenceStore;
use crate::sender::ChannelSenders;
use crate::template::InMemoryTemplateStore;
use crate::types::{DispatchOptions, NotificationRequest};

/// 批量命令的参数
#[derive(Debug, Default)]
pub struct BatchArgs {
    pub file: Option<std::path::PathBuf>,
    pub users: Vec<String>,
    pub notification_type: Option<String>,
    pub data: Option<String>,
    pub sequential: bool,
    pub fail_fast: bool,
    pub validate_templates_first: bool,
    pub flags: DeliveryFlags,
}

/// 命令执行器
///
/// 持有内置模板存储和由配置组装的批量编排器。
pub struct CommandRunner {
    templates: Arc<InMemoryTemplateStore>,
    orchestrator: BatchOrchestrator,
}

impl CommandRunner {
    /// 按配置组装引擎，可选从文件加载用户偏好
    pub fn new(config: &AppConfig, preferences_file: Option<&Path>) -> Result<Self> {
        let preferences = match preferences_file {
            Some(path) => {
                let records = load_preferences(path)?;
                info!(path = %path.display(), count = records.len(), "已加载用户偏好");
                InMemoryPreferenceStore::preferences_for(records)
            }
            None => InMemoryPreferenceStore::new(),
        };

        let templates = Arc::new(InMemoryTemplateStore::with_defaults());
        let executor = DispatchExecutor::from_config(
            config,
            templates.clone(),
            Arc::new(preferences),
            ChannelSenders::simulated(&config.delivery),
        );

        Ok(Self {
            templates,
            orchestrator: BatchOrchestrator::new(executor),
        })
    }

    /// 执行 send 命令
    pub async fn run_send(
        &self,
        user: &str,
        notification_type: &str,
        data: Option<&str>,
        flags: &DeliveryFlags,
    ) -> Result<()> {
        let data = parse_data(data)?;
        let options = flags.apply(DispatchOptions::default());

        let result = self
            .orchestrator
            .executor()
            .send_notification_by_preference(user, notification_type, &data, &options)
            .await;

        print_json(&result)
    }

    /// 执行 batch 命令
    pub async fn run_batch(&self, args: BatchArgs) -> Result<()> {
        let request = build_request(args)?;

        let result = self
            .orchestrator
            .dispatch_batch(
                &request.recipient_ids,
                &request.notification_type,
                &request.data,
                &request.options,
            )
            .await;

        print_json(&result)
    }

    /// 执行 templates 命令
    pub fn run_templates(&self, channel: Option<Channel>) -> Result<()> {
        let channels = match channel {
            Some(channel) => vec![channel],
            None => Channel::ALL.to_vec(),
        };

        let mut listing = serde_json::Map::new();
        for channel in channels {
            let names: serde_json::Map<String, Value> = self
                .templates
                .template_names(channel)
                .into_iter()
                .map(|name| {
                    let languages = self.templates.languages(channel, &name);
                    (name, Value::from(languages))
                })
                .collect();
            listing.insert(channel.to_string(), Value::Object(names));
        }

        print_json(&listing)
    }
}

/// 由文件或命令行参数构造批量请求
///
/// 命令行开关叠加到文件中的选项上。
fn build_request(args: BatchArgs) -> Result<NotificationRequest> {
    let mut request = match &args.file {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("读取批量请求文件失败: {}", path.display()))?;
            NotificationRequest::from_json(&content)
                .with_context(|| format!("解析批量请求文件失败: {}", path.display()))?
        }
        None => {
            let Some(notification_type) = args.notification_type.clone() else {
                bail!("未指定 --file 时必须提供 --type");
            };
            if args.users.is_empty() {
                bail!("未指定 --file 时必须提供 --users");
            }
            NotificationRequest {
                recipient_ids: args.users.clone(),
                notification_type,
                data: parse_data(args.data.as_deref())?,
                options: DispatchOptions::default(),
            }
        }
    };

    let options = args.flags.apply(request.options.clone());
    let parallel = options.parallel_send && !args.sequential;
    let fail_fast = options.fail_fast || args.fail_fast;
    let validate = options.validate_templates_first || args.validate_templates_first;

    request.options = options
        .with_parallel_send(parallel)
        .with_fail_fast(fail_fast)
        .with_validate_templates_first(validate);

    Ok(request)
}

fn load_preferences(path: &Path) -> Result<Vec<UserPreference>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("读取用户偏好文件失败: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("解析用户偏好文件失败: {}", path.display()))
}

/// 解析动态数据，必须是 JSON 对象
fn parse_data(data: Option<&str>) -> Result<Value> {
    let Some(raw) = data else {
        return Ok(Value::Object(serde_json::Map::new()));
    };

    let value: Value = serde_json::from_str(raw).context("动态数据不是合法的 JSON")?;
    if !value.is_object() {
        bail!("动态数据必须是 JSON 对象");
    }
    Ok(value)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
