// src/main.rs
use anyhow::Context;
use dotenvy::dotenv;
use rotation_bot::config::AppConfig;
use rotation_bot::connectors::binance::BinanceClient;
use rotation_bot::connectors::paper::PaperExchange;
use rotation_bot::connectors::traits::MarketDataClient;
use rotation_bot::core::clock::SystemClock;
use rotation_bot::core::engine::{Collaborators, TradingEngine};
use rotation_bot::core::sizer::PositionSizer;
use rotation_bot::logging::init_tracing;
use rotation_bot::storage::{FileJournal, StateStore};
use rotation_bot::strategies::rotation::WorstPerformerRotation;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 1. Load Configuration
    let config = AppConfig::new().context("failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging).context("failed to initialise logging")?;
    let trading = &config.trading;

    info!("========================================");
    info!("       ROTATION BOT - v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!("Basket: {:?}", trading.basket().symbols());
    info!(
        "Mode:   {}",
        if config.live_trading {
            "🚨 LIVE TRADING"
        } else {
            "📝 PAPER TRADING"
        }
    );
    info!("========================================");

    // 2. Initialize Components
    let binance = Arc::new(BinanceClient::with_base_url(
        config.api_key.clone(),
        config.secret_key.clone(),
        &config.base_url,
    ));
    let market: Arc<dyn MarketDataClient> = binance.clone();
    let state_store = StateStore::new(config.storage.state_path(config.live_trading));

    let collaborators = if config.live_trading {
        Collaborators {
            market: market.clone(),
            account: binance.clone(),
            execution: binance,
        }
    } else {
        let paper = Arc::new(PaperExchange::new(
            market.clone(),
            &trading.quote_asset,
            trading.paper_balance,
        ));
        if let Some(held) = state_store.load().await.and_then(|saved| saved.position) {
            paper.seed_position(&held)?;
        }
        Collaborators {
            market,
            account: paper.clone(),
            execution: paper,
        }
    };

    let strategy = WorstPerformerRotation::new(trading.target_gain_factor)
        .with_stop_loss(trading.stop_loss_factor)
        .with_max_hold(trading.max_hold());

    let mut engine = TradingEngine::new(
        trading.engine_settings(),
        trading.basket(),
        strategy,
        collaborators,
        Arc::new(FileJournal::new(&config.storage.trade_log)),
        Arc::new(SystemClock),
    )
    .with_sizer(PositionSizer::new(trading.overspend_factor))
    .with_retry_policy(trading.retry_policy())
    .with_state_store(state_store);

    // 3. Shutdown on Ctrl+C
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            // Keep the sender alive so the engine is not stopped by accident.
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Ctrl+C received, stopping after the current step");
        let _ = shutdown_tx.send(true);
    });

    // 4. Run Engine
    engine.run(shutdown_rx).await;

    Ok(())
}
