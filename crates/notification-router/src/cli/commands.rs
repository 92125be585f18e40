//! CLI 命令定义
//!
//! 使用 clap derive 宏定义命令行接口结构。

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use notify_shared::models::Channel;

use crate::types::DispatchOptions;

/// 通知路由命令行工具
///
/// 使用内置模板、内存偏好存储和模拟发送器驱动派发引擎，结果以 JSON 输出。
#[derive(Parser, Debug)]
#[command(name = "notification-router")]
#[command(version, about = "按用户偏好路由通知")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别，覆盖配置文件 (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// 用户偏好文件（JSON 数组）
    #[arg(short, long, global = true)]
    pub preferences: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 派发选项相关参数
#[derive(Args, Debug, Clone, Default)]
pub struct DeliveryFlags {
    /// 用户关闭全部渠道时仍然发送
    #[arg(long)]
    pub force_send: bool,

    /// 只走有模板的渠道
    #[arg(long)]
    pub combined_only: bool,

    /// 所有开启的渠道都必须有模板
    #[arg(long)]
    pub require_all_channels: bool,
}

impl DeliveryFlags {
    /// 合并到已有选项，命令行开关只打开不关闭
    pub fn apply(&self, options: DispatchOptions) -> DispatchOptions {
        let force_send = options.force_send || self.force_send;
        let combined_only = options.combined_only || self.combined_only;
        let require_all = options.require_all_channels || self.require_all_channels;

        options
            .with_force_send(force_send)
            .with_combined_only(combined_only)
            .with_require_all_channels(require_all)
    }
}

/// 子命令枚举
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 向单个用户派发通知
    Send {
        /// 用户 ID
        #[arg(short, long)]
        user: String,

        /// 通知类型（模板名）
        #[arg(short = 't', long = "type")]
        notification_type: String,

        /// 动态数据（JSON 对象）
        #[arg(short, long)]
        data: Option<String>,

        #[command(flatten)]
        flags: DeliveryFlags,
    },

    /// 批量派发
    ///
    /// 从请求文件读取，或使用 `--users` 与 `--type` 直接指定。
    Batch {
        /// 批量请求文件（JSON）
        #[arg(short, long, conflicts_with = "users")]
        file: Option<PathBuf>,

        /// 逗号分隔的用户 ID
        #[arg(short, long, value_delimiter = ',')]
        users: Vec<String>,

        /// 通知类型（模板名）
        #[arg(short = 't', long = "type")]
        notification_type: Option<String>,

        /// 动态数据（JSON 对象）
        #[arg(short, long)]
        data: Option<String>,

        /// 逐个顺序处理收件人
        #[arg(long)]
        sequential: bool,

        /// 顺序模式下遇到首个失败即停止
        #[arg(long)]
        fail_fast: bool,

        /// 派发前校验基准模板
        #[arg(long)]
        validate_templates_first: bool,

        #[command(flatten)]
        flags: DeliveryFlags,
    },

    /// 列出内置模板及其语言
    Templates {
        /// 只列出指定渠道 (email, sms)
        #[arg(short, long)]
        channel: Option<Channel>,
    },
}
