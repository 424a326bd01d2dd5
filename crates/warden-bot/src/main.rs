//! Warden community bot
//!
//! Serves ticket, suggestion and staff-notification buttons on Discord.
//! Every side-effecting interaction is gated by a shared single-flight
//! guard so double clicks and gateway redeliveries run at most once.

mod actions;
mod config;
mod errors;
mod handlers;
mod health;
mod warden;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serenity::model::gateway::GatewayIntents;
use serenity::prelude::*;
use single_flight::{SingleFlight, Sweeper};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::handlers::Handler;
use crate::health::AppState;
use crate::warden::Warden;

/// Warden bot CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/warden-bot.toml")]
    config: String,

    /// Discord bot token (overrides config file)
    #[arg(long, env = "DISCORD_BOT_TOKEN")]
    bot_token: Option<String>,

    /// Health check server port
    #[arg(long, env = "HEALTH_CHECK_PORT", default_value = "3001")]
    health_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warden_bot=debug,single_flight=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Warden bot");

    let args = Args::parse();

    let mut config = if std::path::Path::new(&args.config).exists() {
        info!("Loading config from file: {}", args.config);
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, loading from environment");
        Config::from_env()?
    };
    if let Some(bot_token) = args.bot_token {
        config.discord.bot_token = bot_token;
    }
    if config.discord.bot_token.is_empty() {
        anyhow::bail!("Discord bot token is empty; set DISCORD_BOT_TOKEN or discord.bot_token");
    }

    for w in config.warnings() {
        warn!("Config: {}", w);
    }

    let guard = Arc::new(SingleFlight::with_config(config.guard.guard_config()));
    let sweep_interval = config.guard.sweep_interval();
    let sweeper = Sweeper::spawn(&guard, sweep_interval);
    info!(
        max_ttl = ?guard.config().max_ttl,
        sweep_interval = ?sweep_interval,
        "Single-flight guard ready"
    );

    let warden = Arc::new(Warden::new(
        guard,
        config.guard.clone(),
        config.discord.clone(),
    ));

    let intents = GatewayIntents::GUILDS;
    let mut client = Client::builder(&config.discord.bot_token, intents)
        .event_handler(Handler)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Discord client: {}", e))?;

    let health_state = AppState::new(warden.guard().clone());
    {
        let mut data = client.data.write().await;
        data.insert::<Warden>(warden);
        data.insert::<AppState>(health_state.clone());
    }

    let health_port = args.health_port;
    tokio::spawn(async move {
        if let Err(e) = health::start_health_server(health_state, health_port).await {
            error!("Health server error: {}", e);
        }
    });

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping Discord client...");
        shard_manager.shutdown_all().await;
    });

    info!("Starting Discord gateway connection...");

    let result = client
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("Discord client error: {}", e));

    sweeper.stop().await;
    info!("Warden bot stopped");
    result
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("Cannot install SIGTERM handler: {}", e);
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}
