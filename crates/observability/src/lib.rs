//! # Observability
//!
//! 可观测性模块：Tracing 日志 + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式，支持 RUST_LOG)
//! - Prometheus 指标导出 (可选)
//! - 相机生命周期与广播指标记录
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{LogFormat, ObservabilityConfig};
//!
//! observability::init_with_config(ObservabilityConfig {
//!     log_format: LogFormat::Compact,
//!     ..Default::default()
//! })?;
//!
//! observability::record_frame_published("plaza", 42);
//! ```

pub mod metrics;

use anyhow::{anyhow, Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_active_consumers, record_consumers_reaped, record_fault, record_frame_latency_ms,
    record_frame_published, record_producer_started, record_producer_stopped, RunningStats,
    StatsSummary,
};

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// 未设置 RUST_LOG 时使用的过滤指令
    pub default_log_level: String,
    /// 为 true 时忽略 RUST_LOG，直接使用 `default_log_level`
    pub force_level: bool,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Compact,
            default_log_level: "info".to_string(),
            force_level: false,
            metrics_port: None,
        }
    }
}

impl ObservabilityConfig {
    /// 由 `-v` 次数推导默认日志级别
    pub fn level_for_verbosity(verbose: u8) -> &'static str {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    fn filter(&self) -> EnvFilter {
        if self.force_level {
            return EnvFilter::new(&self.default_log_level);
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_log_level))
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    #[default]
    Compact,
}

/// 初始化 Tracing，并按需启动 Prometheus 导出
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_thread_names(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_thread_names(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(config.filter())
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize tracing subscriber: {e}"))?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
///
/// 生产线程在未安装 recorder 时照常运行，指标调用为空操作。
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.default_log_level, "info");
        assert_eq!(config.log_format, LogFormat::Compact);
    }

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(ObservabilityConfig::level_for_verbosity(0), "info");
        assert_eq!(ObservabilityConfig::level_for_verbosity(1), "debug");
        assert_eq!(ObservabilityConfig::level_for_verbosity(5), "trace");
    }
}
