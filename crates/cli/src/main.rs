//! # Overlay Streamer CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 模拟消费者驱动的相机共享运行
//! - 优雅关闭处理

mod cli;
mod commands;
mod error;
mod session;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_streamer, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Overlay Streamer CLI starting"
    );

    let result = match &cli.command {
        Commands::Run(args) => run_streamer(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let (level, force_level) = if cli.quiet {
        ("warn", true)
    } else {
        (ObservabilityConfig::level_for_verbosity(cli.verbose), false)
    };

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        default_log_level: level.to_string(),
        force_level,
        metrics_port: None,
    })
}
