//! CLI 模块
//!
//! - `send` - 向单个用户派发通知
//! - `batch` - 批量派发（请求文件或命令行参数）
//! - `templates` - 列出内置模板
//!
//! # 使用示例
//!
//! ```bash
//! notification-router send --user alice@example.com --type welcome --data '{"activation_link":"https://example.com/a"}'
//! notification-router batch --users a@example.com,b@example.com --type welcome --sequential --fail-fast
//! notification-router --preferences prefs.json batch --file request.json
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands, DeliveryFlags};
pub use runner::{BatchArgs, CommandRunner};
