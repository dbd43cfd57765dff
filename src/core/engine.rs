// src/core/engine.rs
use crate::connectors::traits::{AccountClient, ExecutionClient, MarketDataClient};
use crate::core::clock::Clock;
use crate::core::retry::{RetryPolicy, StepOutcome};
use crate::core::sizer::PositionSizer;
use crate::errors::{BotError, Result};
use crate::market::{MarketSnapshotProvider, SymbolConstraintRegistry};
use crate::storage::{PersistedState, StateStore, TradeJournal};
use crate::strategies::traits::Strategy;
use crate::types::{Basket, ExitReason, Phase, Position, TradeAction, TradeEvent};
use crate::utils::precision::{is_step_aligned, normalize_price, normalize_quantity};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Binance code for an order that violates a symbol filter.
const FILTER_FAILURE_CODE: i64 = -1013;

/// Lifecycle of the single trade. The position lives inside the variants that
/// own it, so it exists exactly in `Monitoring` and `Closing`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineState {
    Idle,
    Opening { symbol: String, invest: Decimal },
    Monitoring(Position),
    Closing(Position),
}

impl EngineState {
    pub fn phase(&self) -> Phase {
        match self {
            EngineState::Idle => Phase::Idle,
            EngineState::Opening { .. } => Phase::Opening,
            EngineState::Monitoring(_) => Phase::Monitoring,
            EngineState::Closing(_) => Phase::Closing,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        match self {
            EngineState::Monitoring(p) | EngineState::Closing(p) => Some(p),
            _ => None,
        }
    }

    fn from_persisted(saved: PersistedState) -> Self {
        match (saved.phase, saved.position) {
            (Phase::Closing, Some(p)) => EngineState::Closing(p),
            (_, Some(p)) => EngineState::Monitoring(p),
            (_, None) => EngineState::Idle,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub quote_asset: String,
    /// Share of the free quote balance committed per trade.
    pub invest_fraction: Decimal,
    /// Below this free balance no trade is attempted.
    pub min_trade_balance: Decimal,
}

/// Exchange-facing dependencies handed to the engine at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub market: Arc<dyn MarketDataClient>,
    pub account: Arc<dyn AccountClient>,
    pub execution: Arc<dyn ExecutionClient>,
}

pub struct TradingEngine<S> {
    settings: EngineSettings,
    basket: Basket,
    strategy: S,
    provider: MarketSnapshotProvider,
    registry: SymbolConstraintRegistry,
    sizer: PositionSizer,
    account: Arc<dyn AccountClient>,
    execution: Arc<dyn ExecutionClient>,
    journal: Arc<dyn TradeJournal>,
    state_store: Option<StateStore>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    state: EngineState,
    consecutive_failures: u32,
}

impl<S> TradingEngine<S>
where
    S: Strategy,
{
    pub fn new(
        settings: EngineSettings,
        basket: Basket,
        strategy: S,
        collaborators: Collaborators,
        journal: Arc<dyn TradeJournal>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            basket,
            strategy,
            provider: MarketSnapshotProvider::new(collaborators.market.clone()),
            registry: SymbolConstraintRegistry::new(collaborators.market),
            sizer: PositionSizer::default(),
            account: collaborators.account,
            execution: collaborators.execution,
            journal,
            state_store: None,
            clock,
            retry: RetryPolicy::default(),
            state: EngineState::Idle,
            consecutive_failures: 0,
        }
    }

    pub fn with_sizer(mut self, sizer: PositionSizer) -> Self {
        self.sizer = sizer;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_state_store(mut self, store: StateStore) -> Self {
        self.state_store = Some(store);
        self
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn position(&self) -> Option<&Position> {
        self.state.position()
    }

    /// Resumes a position left open by a previous run.
    pub async fn restore(&mut self) {
        let Some(store) = &self.state_store else {
            return;
        };
        if let Some(saved) = store.load().await {
            self.state = EngineState::from_persisted(saved);
            if let Some(p) = self.state.position() {
                warn!(
                    symbol = %p.symbol,
                    quantity = %p.quantity,
                    entry_price = %p.entry_price,
                    phase = ?self.state.phase(),
                    "Resuming open position from previous run"
                );
            }
        }
    }

    /// Drives the state machine until `shutdown` flips to true.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            strategy = %self.strategy.name(),
            basket = ?self.basket.symbols(),
            "Engine starting..."
        );
        self.restore().await;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.step().await;
            let delay = self
                .retry
                .next_delay(self.state.phase(), outcome, self.consecutive_failures);

            tokio::select! {
                _ = self.clock.sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        match self.state.position() {
            Some(p) => warn!(
                symbol = %p.symbol,
                quantity = %p.quantity,
                entry_price = %p.entry_price,
                "Stopped while holding a position; it stays saved for the next start"
            ),
            None => info!("Engine stopped with no open position"),
        }
    }

    /// Executes the current state's action once and applies the transition.
    pub async fn step(&mut self) -> StepOutcome {
        let previous = self.state.phase();

        let (next, outcome) = match self.state.clone() {
            EngineState::Idle => self.select_candidate().await,
            EngineState::Opening { symbol, invest } => self.open_position(symbol, invest).await,
            EngineState::Monitoring(position) => self.monitor(position).await,
            EngineState::Closing(position) => self.close(position).await,
        };
        self.state = next;

        self.consecutive_failures = match outcome {
            StepOutcome::Failed => self.consecutive_failures.saturating_add(1),
            _ => 0,
        };

        if self.state.phase() != previous {
            debug!(from = ?previous, to = ?self.state.phase(), "Transition");
            self.persist().await;
        }
        outcome
    }

    async fn select_candidate(&mut self) -> (EngineState, StepOutcome) {
        let asset = self.settings.quote_asset.clone();
        let balance = match self.account.get_free_balance(&asset).await {
            Ok(balance) => balance,
            Err(e) => {
                error!(asset = %asset, operation = "get_free_balance", "Balance fetch failed: {}", e);
                return (EngineState::Idle, StepOutcome::Failed);
            }
        };

        if balance < self.settings.min_trade_balance {
            warn!(
                "Insufficient {} balance to trade ({} < {}). Waiting...",
                asset, balance, self.settings.min_trade_balance
            );
            return (EngineState::Idle, StepOutcome::Waiting);
        }

        let snapshots = match self.provider.get_basket_snapshots(&self.basket).await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                warn!(operation = "get_basket_snapshots", "No candidates this cycle: {}", e);
                return (EngineState::Idle, StepOutcome::Failed);
            }
        };

        let Some(pick) = self.strategy.select(&snapshots) else {
            return (EngineState::Idle, StepOutcome::Failed);
        };

        let invest = balance * self.settings.invest_fraction;
        info!(
            symbol = %pick.symbol,
            change_24h = %pick.percent_change_24h,
            %invest,
            "Crypto with the largest loss selected"
        );
        (
            EngineState::Opening {
                symbol: pick.symbol.clone(),
                invest,
            },
            StepOutcome::Advanced,
        )
    }

    async fn open_position(&mut self, symbol: String, invest: Decimal) -> (EngineState, StepOutcome) {
        match self.try_open(&symbol, invest).await {
            Ok(position) => {
                info!(
                    symbol = %position.symbol,
                    quantity = %position.quantity,
                    entry_price = %position.entry_price,
                    %invest,
                    "✅ Position opened"
                );
                self.emit(TradeAction::Buy, &symbol, position.quantity, position.entry_price)
                    .await;
                (EngineState::Monitoring(position), StepOutcome::Advanced)
            }
            Err(e) => {
                error!(symbol = %symbol, operation = "open_position", "Buy aborted: {}", e);
                if let BotError::ExchangeRejection {
                    code: Some(FILTER_FAILURE_CODE),
                    ..
                } = e
                {
                    self.registry.invalidate(&symbol);
                }
                self.emit(TradeAction::Error, &symbol, Decimal::ZERO, Decimal::ZERO)
                    .await;
                (EngineState::Idle, StepOutcome::Failed)
            }
        }
    }

    async fn try_open(&mut self, symbol: &str, invest: Decimal) -> Result<Position> {
        let constraints = self.registry.get_constraints(symbol).await?;
        let quote = self.provider.get_snapshot(symbol).await?;
        let quantity = self
            .sizer
            .compute_order_quantity(invest, quote.last_price, &constraints)?;
        if quantity < constraints.min_qty || !is_step_aligned(quantity, constraints.step_size) {
            return Err(BotError::Configuration(format!(
                "{symbol}: refusing off-grid quantity {quantity}"
            )));
        }

        let fill = self.execution.place_market_buy(symbol, quantity).await?;
        if fill.filled_qty <= Decimal::ZERO {
            return Err(BotError::rejection("buy order filled zero quantity"));
        }

        let entry_price = if fill.avg_price > Decimal::ZERO {
            fill.avg_price
        } else {
            quote.last_price
        };
        let target = normalize_price(self.strategy.target_price(entry_price), constraints.tick_size);
        info!(symbol, %entry_price, %target, "Waiting for pump");

        // Fees taken in the base asset can leave the holding off the lot grid.
        let sellable = normalize_quantity(fill.filled_qty, constraints.step_size);
        let quantity = if sellable.is_zero() {
            fill.filled_qty
        } else {
            sellable
        };
        if quantity != fill.filled_qty {
            debug!(symbol, filled = %fill.filled_qty, %quantity, "Holding floored to the lot step");
        }

        Ok(Position {
            symbol: symbol.to_string(),
            quantity,
            entry_price,
            opened_at: self.clock.now(),
        })
    }

    async fn monitor(&mut self, position: Position) -> (EngineState, StepOutcome) {
        let quote = match self.provider.get_snapshot(&position.symbol).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(
                    symbol = %position.symbol,
                    operation = "get_snapshot",
                    "Price poll failed, still holding: {}",
                    e
                );
                return (EngineState::Monitoring(position), StepOutcome::Failed);
            }
        };

        match self
            .strategy
            .exit_signal(&position, quote.last_price, self.clock.now())
        {
            Some(reason) => {
                match reason {
                    ExitReason::TargetReached => info!(
                        symbol = %position.symbol,
                        price = %quote.last_price,
                        entry_price = %position.entry_price,
                        "Target reached, closing"
                    ),
                    ExitReason::StopLoss | ExitReason::MaxHoldExceeded => warn!(
                        symbol = %position.symbol,
                        price = %quote.last_price,
                        entry_price = %position.entry_price,
                        ?reason,
                        "Exit bound hit, closing"
                    ),
                }
                (EngineState::Closing(position), StepOutcome::Advanced)
            }
            None => {
                debug!(symbol = %position.symbol, price = %quote.last_price, "Holding");
                (EngineState::Monitoring(position), StepOutcome::Waiting)
            }
        }
    }

    async fn close(&mut self, position: Position) -> (EngineState, StepOutcome) {
        match self
            .execution
            .place_market_sell(&position.symbol, position.quantity)
            .await
        {
            Ok(fill) if fill.filled_qty > Decimal::ZERO => {
                let pnl = (fill.avg_price - position.entry_price) * position.quantity;
                info!(
                    symbol = %position.symbol,
                    quantity = %position.quantity,
                    price = %fill.avg_price,
                    %pnl,
                    "Trade completed"
                );
                self.emit(
                    TradeAction::Sell,
                    &position.symbol,
                    position.quantity,
                    fill.avg_price,
                )
                .await;
                (EngineState::Idle, StepOutcome::Advanced)
            }
            Ok(_) => {
                error!(symbol = %position.symbol, "Sell filled zero quantity. Holding the position for retry.");
                self.emit(TradeAction::Error, &position.symbol, position.quantity, Decimal::ZERO)
                    .await;
                (EngineState::Closing(position), StepOutcome::Failed)
            }
            Err(e) => {
                error!(
                    symbol = %position.symbol,
                    operation = "close_position",
                    "Failed to sell: {}. Holding the position for retry.",
                    e
                );
                self.emit(TradeAction::Error, &position.symbol, position.quantity, Decimal::ZERO)
                    .await;
                (EngineState::Closing(position), StepOutcome::Failed)
            }
        }
    }

    async fn emit(&self, action: TradeAction, symbol: &str, quantity: Decimal, price: Decimal) {
        let event = TradeEvent {
            timestamp: self.clock.now(),
            action,
            symbol: symbol.to_string(),
            quantity,
            price,
        };
        if let Err(e) = self.journal.record(&event).await {
            error!(%event, "Failed to append trade event: {}", e);
        }
    }

    async fn persist(&self) {
        let Some(store) = &self.state_store else {
            return;
        };
        let snapshot = PersistedState {
            phase: self.state.phase(),
            position: self.state.position().cloned(),
        };
        if let Err(e) = store.save(&snapshot).await {
            error!("Failed to save bot state: {}", e);
        }
    }
}
