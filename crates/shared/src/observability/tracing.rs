//! 日志初始化模块
//!
//! 基于 tracing-subscriber 组合环境过滤器与格式化层，支持 JSON 与人类可读两种输出。

use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use super::ObservabilityConfig;

/// 初始化日志
///
/// 使用 `try_init`，全局 subscriber 已存在时静默跳过，测试中可多次调用。
/// 日志写到 stderr，stdout 留给命令输出。返回本次是否真正完成了安装。
pub fn init(config: &ObservabilityConfig) -> bool {
    let env_filter = build_filter(&config.log_level);

    let fmt_layer = if config.json_logs {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
}

/// 构建环境过滤器：RUST_LOG 优先，其次是配置的级别，均无效时使用 info
pub fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
