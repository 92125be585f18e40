//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。未安装 recorder 时，
//! 所有记录函数都是空操作。

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use super::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    _handle: PrometheusHandle,
}

/// 初始化 Prometheus 指标导出
///
/// 在指定端口启动 exporter 自带的 HTTP 监听器暴露 `/metrics`。
/// 需要在 tokio runtime 中调用。
pub fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));

    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(addr)
        .build()?;
    let handle = recorder.handle();

    metrics::set_global_recorder(recorder)
        .map_err(|_| anyhow::anyhow!("metrics recorder already installed"))?;
    tokio::spawn(exporter);

    register_common_metrics(&config.service_name);

    info!("Metrics server listening on {}", addr);

    Ok(MetricsHandle { _handle: handle })
}

/// 注册通用指标描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        "notification_channel_sends_total",
        "Total number of channel send attempts"
    );
    metrics::describe_histogram!(
        "notification_channel_send_duration_seconds",
        "Channel send duration in seconds"
    );

    metrics::describe_counter!(
        "notification_dispatches_total",
        "Total number of single-recipient dispatches"
    );
    metrics::describe_histogram!(
        "notification_dispatch_duration_seconds",
        "Single-recipient dispatch duration in seconds"
    );

    metrics::describe_counter!("notification_batches_total", "Total number of batches");
    metrics::describe_histogram!(
        "notification_batch_duration_seconds",
        "Batch duration in seconds"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录单个渠道的发送
#[inline]
pub fn record_channel_send(channel: &str, status: &str, duration_secs: f64) {
    metrics::counter!(
        "notification_channel_sends_total",
        "channel" => channel.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "notification_channel_send_duration_seconds",
        "channel" => channel.to_string()
    )
    .record(duration_secs);
}

/// 记录单个收件人的派发
#[inline]
pub fn record_dispatch(outcome: &str, duration_secs: f64) {
    metrics::counter!(
        "notification_dispatches_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);

    metrics::histogram!("notification_dispatch_duration_seconds").record(duration_secs);
}

/// 记录批量派发
#[inline]
pub fn record_batch(mode: &str, recipients: usize, duration_secs: f64) {
    metrics::counter!("notification_batches_total", "mode" => mode.to_string()).increment(1);
    metrics::counter!("notification_batch_recipients_total").increment(recipients as u64);
    metrics::histogram!(
        "notification_batch_duration_seconds",
        "mode" => mode.to_string()
    )
    .record(duration_secs);
}
