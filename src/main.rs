use anyhow::{bail, Context};
use clap::Parser;
use dispatch_service::{BackgroundService, DispatchOutcome, Dispatcher, TriggerSchedule};
use picturebot_core::{AppConfig, HistoryFile};
use reddit_client::{RedditApiClient, RedditClientConfig};
use std::path::PathBuf;
use std::sync::Arc;
use telegram_bot::{TelegramBot, TelegramConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "picturebot=info,picturebot_core=info,reddit_client=info,telegram_bot=info,dispatch_service=info";

/// Posts fresh pictures from subreddits to a Telegram group.
#[derive(Debug, Parser)]
#[command(name = "picturebot", version, about)]
struct Cli {
    /// Configuration file (TOML, or JSON with a .json extension)
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Use this subreddit instead of a random one from the configuration
    #[arg(long)]
    subreddit: Option<String>,

    /// Post to the test group instead of the main group
    #[arg(long)]
    test: bool,

    /// Run a single dispatch cycle now
    #[arg(long)]
    send: bool,

    /// Keep running and dispatch on the configured triggers
    #[arg(long = "loop")]
    run_loop: bool,
}

impl Cli {
    /// Fails before anything is sent when `--loop` has no trigger to wait for.
    fn check_schedule(&self, config: &AppConfig) -> anyhow::Result<()> {
        if self.run_loop && config.triggers.is_empty() {
            bail!("no triggers configured, --loop has nothing to schedule");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    if !cli.send && !cli.run_loop {
        bail!("nothing to do, pass --send and/or --loop");
    }

    tracing::info!("Starting picturebot");

    let config = Arc::new(
        AppConfig::from_file(&cli.config)
            .with_context(|| format!("failed to load {}", cli.config.display()))?,
    );
    let chat_id = config
        .chat_id(cli.test)
        .context("no chat configured for this run")?;
    cli.check_schedule(&config)?;
    let mut schedule = TriggerSchedule::new(config.triggers.clone());

    let reddit = RedditApiClient::new(RedditClientConfig::from_settings(
        &config.reddit,
        config.max_candidates,
    ))
    .context("failed to create Reddit client")?;
    let telegram = TelegramBot::new(TelegramConfig::from_settings(
        config.bot_token.clone(),
        &config.telegram,
    ))
    .context("failed to create Telegram bot")?;

    let mut dispatcher = Dispatcher::new(config.clone(), reddit, telegram)?
        .with_history_file(HistoryFile::new(&config.history_file))
        .with_context(|| format!("failed to load {}", config.history_file.display()))?;

    if cli.send {
        match dispatcher.run_cycle(cli.subreddit.as_deref(), chat_id).await {
            DispatchOutcome::Sent { subreddit, post_id } => {
                tracing::info!("Sent {} from r/{}", post_id, subreddit);
            }
            outcome => tracing::warn!("Nothing sent: {:?}", outcome),
        }
    }

    if cli.run_loop {
        let service = BackgroundService::from_seconds(config.tick_interval_seconds);
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };
        let cycles = service
            .run(
                &mut dispatcher,
                &mut schedule,
                chat_id,
                cli.subreddit.as_deref(),
                shutdown,
            )
            .await;
        tracing::info!("Stopped after {} dispatch cycles", cycles);
    }

    Ok(())
}
