//! Headless clock session: drives the clock when run as the game's creator, follows it otherwise.
//!
//! Environment: `CLOCK_SERVER_URL` (default `http://localhost:8080`), `CLOCK_GAME_ID`
//! (required), `CLOCK_IDENTITY` (optional). Sending `p` + Enter toggles pause.

use std::{env, sync::Arc};

use anyhow::Context;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::watch,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use blind_clock::{
    clock::{
        display::TimerDisplay,
        remote::{DEFAULT_REQUEST_TIMEOUT, HttpTimerSync},
        session::{self, ClockCommand, SessionConfig, SystemWallClock},
    },
    config::AppConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_config = AppConfig::load();
    let server_url =
        env::var("CLOCK_SERVER_URL").unwrap_or_else(|_| "http://localhost:8080".into());
    let game_id: Uuid = env::var("CLOCK_GAME_ID")
        .context("CLOCK_GAME_ID must be set")?
        .parse()
        .context("CLOCK_GAME_ID must be a UUID")?;
    let identity = env::var("CLOCK_IDENTITY")
        .ok()
        .filter(|value| !value.trim().is_empty());

    let sync = HttpTimerSync::new(&server_url, DEFAULT_REQUEST_TIMEOUT)
        .context("building HTTP client")?;

    let config = SessionConfig {
        polling: app_config.polling_policy(),
        persist_every_ticks: app_config.persist_every_ticks(),
        tick_period: app_config.tick_period(),
        ..SessionConfig::new(game_id, identity)
    };

    info!(%server_url, %game_id, "following tournament clock");
    let handle = session::spawn(config, Arc::new(sync), Arc::new(SystemWallClock));
    let mut updates = handle.display();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let line = latest_line(&mut updates);
                info!("{line}");
            }
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim() == "p" => {
                    if handle.send(ClockCommand::TogglePause).await.is_err() {
                        break;
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) => stdin_open = false,
                Err(err) => {
                    warn!(error = %err, "failed to read stdin; pause toggling disabled");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown().await.context("joining clock session")?;
    Ok(())
}

/// Render the newest display snapshot and mark it seen.
fn latest_line(updates: &mut watch::Receiver<TimerDisplay>) -> String {
    updates.borrow_and_update().to_string()
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
