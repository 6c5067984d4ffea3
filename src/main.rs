use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use content_scheduler::{Application, ShutdownManager};
use scheduler_config::{AppConfig, LogFormat};
use scheduler_domain::{Frequency, SchedulingConfig};
use scheduler_infrastructure::{init_logging, init_metrics};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("content-scheduler")
        .version("1.0.0")
        .about("内容任务调度与执行系统")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，不指定时按默认路径查找"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别，覆盖配置文件")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式，覆盖配置文件")
                .value_parser(["json", "pretty", "compact"]),
        )
        .arg(
            Arg::new("channel")
                .long("channel")
                .value_name("CHANNEL_ID")
                .help("启动后为该频道安排内容，可重复指定")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("frequency")
                .long("frequency")
                .value_name("FREQUENCY")
                .help("--channel 使用的发布频率")
                .value_parser(["daily", "weekly", "monthly"])
                .default_value("daily"),
        )
        .arg(
            Arg::new("category")
                .long("category")
                .value_name("CATEGORY")
                .help("--channel 使用的内容分类")
                .default_value("general"),
        )
        .arg(
            Arg::new("print-config")
                .long("print-config")
                .help("打印生效的配置并退出")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config");
    let mut config = AppConfig::load(config_path.map(String::as_str)).with_context(|| {
        format!(
            "加载配置失败: {}",
            config_path.map(String::as_str).unwrap_or("<默认路径>")
        )
    })?;

    if let Some(level) = matches.get_one::<String>("log-level") {
        config.observability.log_level = level.clone();
    }
    if let Some(format) = matches.get_one::<String>("log-format") {
        config.observability.log_format = format
            .parse::<LogFormat>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    if matches.get_flag("print-config") {
        println!("{}", config.to_toml_string()?);
        return Ok(());
    }

    init_logging(
        &config.observability.log_level,
        config.observability.log_format,
    )?;
    if config.observability.metrics_enabled {
        init_metrics(&config.observability.metrics_bind_address)?;
    }

    info!("启动内容任务调度系统");
    info!(
        "worker数量: {}，调度间隔: {}ms",
        config.scheduler.worker_count, config.scheduler.tick_interval_ms
    );

    // worker 超时之后还要排空队列，外层多留一点余量
    let shutdown_timeout = config.scheduler.shutdown_timeout() + Duration::from_secs(5);
    let mut app = Application::new(config).await?;

    if let Some(channels) = matches.get_many::<String>("channel") {
        let frequency: Frequency = matches
            .get_one::<String>("frequency")
            .map(String::as_str)
            .unwrap_or("daily")
            .parse()?;
        let category = matches
            .get_one::<String>("category")
            .map(String::as_str)
            .unwrap_or("general");
        for channel_id in channels {
            app = app.with_schedule(channel_id.clone(), SchedulingConfig::new(frequency, category));
        }
    }

    let shutdown_manager = ShutdownManager::new();
    let app_handle = {
        let shutdown_rx = shutdown_manager.subscribe();

        tokio::spawn(async move {
            match app.run(shutdown_rx).await {
                Ok(report) => info!(
                    "调度器已停止: {} 个worker，{} 个任务退回待执行",
                    report.workers_stopped, report.tasks_returned
                ),
                Err(e) => error!("应用运行失败: {e:#}"),
            }
        })
    };

    wait_for_shutdown_signal().await;
    info!("收到关闭信号，开始优雅关闭...");

    let finished = shutdown_manager
        .shutdown_within(shutdown_timeout, async {
            if let Err(e) = app_handle.await {
                error!("应用关闭时发生错误: {e}");
            }
        })
        .await;
    if finished {
        info!("应用已优雅关闭");
    } else {
        warn!("应用关闭超时，强制退出");
    }

    info!("内容任务调度系统已退出");
    Ok(())
}

/// 等待 Ctrl+C 或 SIGTERM
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("安装Ctrl+C信号处理器失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
