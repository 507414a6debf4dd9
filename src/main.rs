use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use sysreview_helper::cli::{Cli, Command, KeyAction};
use sysreview_helper::credentials::KeyStore;
use sysreview_helper::error::OracleError;
use sysreview_helper::orchestrator::parse_to_csv;
use sysreview_helper::utils::logging;
use sysreview_helper::{App, Config};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    match begin(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // 配置加载失败时日志尚未初始化
            logging::init(verbose);
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn begin(cli: Cli) -> Result<()> {
    // 加载配置：文件 → 环境变量 → 命令行
    let config = cli.apply_overrides(Config::load(cli.config_path())?);
    logging::init(config.verbose_logging);

    match &cli.command {
        Command::Parse { input, output } => {
            let output = output.clone().unwrap_or_else(|| config.parsed_csv_path());
            parse_to_csv(input, &output).await?;
        }

        Command::Score { input, output, theme } => {
            let theme = theme.resolve(&config)?;
            let input = input.clone().unwrap_or_else(|| config.parsed_csv_path());
            let output = output.clone().unwrap_or_else(|| config.scored_csv_path());
            let app = build_app(config)?;
            app.score_csv(&input, &output, &theme).await?;
        }

        Command::Run { input, output, theme } => {
            let theme = theme.resolve(&config)?;
            let output = output.clone().unwrap_or_else(|| config.scored_csv_path());
            let app = build_app(config)?;
            app.run_export(input, &output, &theme).await?;
        }

        Command::Key { action } => {
            let store = KeyStore::default_location()?;
            match action {
                KeyAction::Set { key } => store.save(key)?,
                KeyAction::Show => match store.masked() {
                    Some(masked) => info!("🔑 当前密钥: {}", masked),
                    None => info!("未保存密钥 ({})", store.path().display()),
                },
                KeyAction::Delete => {
                    if !store.delete()? {
                        info!("没有可删除的密钥文件");
                    }
                }
            }
        }
    }

    Ok(())
}

/// 读取密钥、创建应用，并把 Ctrl-C 接到取消信号上
fn build_app(config: Config) -> Result<App> {
    let api_key = KeyStore::default_location()?
        .load()
        .ok_or(OracleError::MissingApiKey)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Ctrl-C 监听失败: {}", e);
                return;
            }
            warn!("⏹️ 收到 Ctrl-C，正在停止，已完成的结果会照常写出...");
            cancel.cancel();
        });
    }

    let app = App::initialize(config, &api_key)
        .context("应用初始化失败")?
        .with_cancellation(cancel);
    Ok(app)
}
