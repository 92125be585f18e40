//! 通知路由命令行入口
//!
//! 加载配置、初始化可观测性，然后执行子命令。

use clap::Parser;
use notification_router::cli::{BatchArgs, Cli, CommandRunner, Commands};
use notify_shared::config::AppConfig;
use notify_shared::observability;
use tracing::info;

const SERVICE_NAME: &str = "notification-router";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(SERVICE_NAME)?;
    if let Some(level) = &cli.log_level {
        config.observability = config.observability.with_log_level(level.clone());
    }
    let _guard = observability::init(&config.observability)?;

    info!(
        service = SERVICE_NAME,
        environment = %config.environment,
        "Starting notification-router..."
    );

    let runner = CommandRunner::new(&config, cli.preferences.as_deref())?;

    match cli.command {
        Commands::Send {
            user,
            notification_type,
            data,
            flags,
        } => {
            runner
                .run_send(&user, &notification_type, data.as_deref(), &flags)
                .await?;
        }
        Commands::Batch {
            file,
            users,
            notification_type,
            data,
            sequential,
            fail_fast,
            validate_templates_first,
            flags,
        } => {
            runner
                .run_batch(BatchArgs {
                    file,
                    users,
                    notification_type,
                    data,
                    sequential,
                    fail_fast,
                    validate_templates_first,
                    flags,
                })
                .await?;
        }
        Commands::Templates { channel } => runner.run_templates(channel)?,
    }

    Ok(())
}
