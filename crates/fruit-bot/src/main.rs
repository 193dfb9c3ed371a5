// ============================================================================
// fruit-bot — Telegram runner for the fruit collection bot
// ============================================================================
// Loads configuration from the environment (and .env), then long-polls the
// Bot API and feeds each update through the dispatcher, one at a time.
// ============================================================================

use anyhow::Result;
use fruit_core::{
    open_store, BotConfig, BotError, Catalog, CooldownPolicy, Dispatcher, SessionRegistry, TelegramExecutor,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Backoff after a failed poll, doubled per consecutive failure
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fruit_bot=debug".parse()?)
                .add_directive("fruit_core=debug".parse()?),
        )
        .init();

    info!("Starting Fruit Collector bot");

    let config = BotConfig::from_env()?;
    let token = config.require_token()?.to_string();

    let catalog = match Catalog::load(&config.catalog_path) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            error!("Cannot start without a valid catalog: {}", e);
            return Err(e);
        }
    };

    let store = open_store(config.store_backend, config.store_path.as_deref())?;
    info!("Ledger store: {}", store.describe());
    info!("{} operators configured", config.operators.len());

    let executor = Arc::new(TelegramExecutor::new(token));
    executor.get_me().await?;

    let mut dispatcher = Dispatcher::new(
        catalog,
        store,
        config.operators.clone(),
        executor.clone(),
        StdRng::from_entropy(),
    )
    .with_cooldown(CooldownPolicy::new(config.draw_cooldown))
    .with_sessions(SessionRegistry::new(config.session_ttl));

    run_loop(&executor, &mut dispatcher, config.poll_timeout_secs).await
}

async fn run_loop(
    executor: &TelegramExecutor,
    dispatcher: &mut Dispatcher<StdRng>,
    poll_timeout_secs: u64,
) -> Result<()> {
    let mut offset: Option<i64> = None;
    let mut backoff = INITIAL_BACKOFF;

    info!("Polling for updates (timeout {}s)", poll_timeout_secs);
    loop {
        let polled = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
            polled = executor.get_updates(offset, poll_timeout_secs) => polled,
        };

        let updates = match polled {
            Ok(updates) => {
                backoff = INITIAL_BACKOFF;
                updates
            }
            Err(e) => {
                warn!("Polling failed: {} - retrying in {}s", e, backoff.as_secs());
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            let Some(event) = update.into_event() else {
                continue;
            };

            if let Err(e) = dispatcher.handle(event).await {
                if let Some(BotError::CatalogEmpty(rarity)) = e.downcast_ref::<BotError>() {
                    error!("Catalog has no {} fruits; stopping", rarity);
                    return Err(e);
                }
                warn!("Failed to handle update: {}", e);
            }
        }
    }

    Ok(())
}
