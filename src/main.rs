use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use order_location_sync::config::Config;
use order_location_sync::models::{AutomationRequest, WorkflowKind};
use order_location_sync::progress::{encode_frame, progress_channel};
use order_location_sync::server::{self, AppState};
use order_location_sync::{logger, ChromiumFactory, GoogleSheetsClient, WorkflowRunner};

#[derive(Parser)]
#[command(name = "order-location-sync")]
#[command(version, about = "Look up order locations in the portal and sync them to Google Sheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file (environment variables still override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP + SSE API
    Serve {
        /// Listen address, e.g. 127.0.0.1:3000
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run one workflow and print progress frames to stdout
    Run {
        #[arg(long, env = "PORTAL_USERNAME")]
        username: String,

        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,

        /// Google Sheets share URL
        #[arg(long)]
        sheet_url: Option<String>,

        /// Only log in and select the facility
        #[arg(long)]
        facility_only: bool,

        /// Process every matching order without writing back
        #[arg(long)]
        search_only: bool,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    if cli.verbose {
        config.verbose_logging = true;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli).context("加载配置失败")?;

    // 初始化日志
    logger::init(config.verbose_logging);

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            let sheets = GoogleSheetsClient::new(&config.sheets)?;
            let state = AppState::new(config, ChromiumFactory, sheets);
            server::serve(state).await?;
        }
        Commands::Run {
            username,
            password,
            sheet_url,
            facility_only,
            search_only,
        } => {
            if search_only {
                config.batch = order_location_sync::config::BatchProfile::search_only();
            }
            let kind = if facility_only {
                WorkflowKind::FacilityOnly
            } else {
                WorkflowKind::OrderSync
            };
            let request = AutomationRequest::new(&username, &password, sheet_url.as_deref());
            run_once(config, kind, request).await?;
        }
    }

    Ok(())
}

async fn run_once(config: Config, kind: WorkflowKind, request: AutomationRequest) -> Result<()> {
    let sheets = GoogleSheetsClient::new(&config.sheets)?;
    let (tx, mut rx) = progress_channel();
    let runner = WorkflowRunner::new(&config, kind, ChromiumFactory, sheets, tx);

    let printer = tokio::spawn(async move {
        while let Some(state) = rx.recv().await {
            match encode_frame(&state) {
                Ok(frame) => print!("{}", frame),
                Err(e) => warn!("⚠️ 无法编码进度帧: {}", e),
            }
        }
    });

    let outcome = runner.run(&request).await;
    printer.await.context("进度输出任务异常退出")?;

    if let Some(mut driver) = outcome.driver {
        info!("浏览器保持打开，按 Ctrl+C 关闭并退出");
        tokio::signal::ctrl_c().await?;
        driver.close().await?;
    }

    match outcome.final_state.error {
        Some(error) => anyhow::bail!(error),
        None => Ok(()),
    }
}
