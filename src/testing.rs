//! Scripted collaborators for unit tests.
//!
//! `FakeExchange` answers every collaborator trait from in-memory scripts and
//! records the orders it receives. `ManualClock` advances only when slept on.

use crate::connectors::traits::{AccountClient, ExecutionClient, MarketDataClient};
use crate::core::clock::Clock;
use crate::errors::{BotError, Result};
use crate::storage::TradeJournal;
use crate::types::{Fill, SymbolFilters, TickerSnapshot, TradeEvent};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Queue of scripted replies; the last one is repeated once the rest are used.
type Script<T> = VecDeque<Result<T>>;

fn next_reply<T: Clone>(script: &mut Script<T>) -> Option<Result<T>> {
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    }
}

#[derive(Default)]
pub struct FakeExchange {
    tickers: Mutex<HashMap<String, Script<TickerSnapshot>>>,
    filters: Mutex<HashMap<String, Result<SymbolFilters>>>,
    balance: Mutex<Script<Decimal>>,
    buy_replies: Mutex<VecDeque<Result<Fill>>>,
    sell_replies: Mutex<VecDeque<Result<Fill>>>,
    pub buys: Mutex<Vec<(String, Decimal)>>,
    pub sells: Mutex<Vec<(String, Decimal)>>,
    pub filter_calls: AtomicUsize,
}

impl FakeExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the script for `symbol` with a single sticky quote.
    pub fn set_ticker(&self, symbol: &str, price: Decimal, percent: Decimal) {
        let snapshot = TickerSnapshot {
            symbol: symbol.to_string(),
            last_price: price,
            percent_change_24h: percent,
        };
        let mut tickers = self.tickers.lock().unwrap();
        tickers.insert(symbol.to_string(), VecDeque::from([Ok(snapshot)]));
    }

    /// Appends quotes (or failures) that are served in order.
    pub fn script_ticker(&self, symbol: &str, replies: Vec<Result<Decimal>>) {
        let mut tickers = self.tickers.lock().unwrap();
        let script = tickers.entry(symbol.to_string()).or_default();
        script.clear();
        for reply in replies {
            script.push_back(reply.map(|price| TickerSnapshot {
                symbol: symbol.to_string(),
                last_price: price,
                percent_change_24h: Decimal::ZERO,
            }));
        }
    }

    pub fn fail_ticker(&self, symbol: &str) {
        let mut tickers = self.tickers.lock().unwrap();
        tickers.insert(
            symbol.to_string(),
            VecDeque::from([Err(BotError::TransientNetwork(format!("{symbol} timed out")))]),
        );
    }

    pub fn set_filters(&self, symbol: &str, min_qty: &str, step_size: &str, tick_size: &str) {
        self.filters.lock().unwrap().insert(
            symbol.to_string(),
            Ok(SymbolFilters {
                symbol: symbol.to_string(),
                min_qty: min_qty.to_string(),
                step_size: step_size.to_string(),
                tick_size: tick_size.to_string(),
            }),
        );
    }

    pub fn fail_filters(&self, symbol: &str, err: BotError) {
        self.filters.lock().unwrap().insert(symbol.to_string(), Err(err));
    }

    pub fn set_balance(&self, free: Decimal) {
        *self.balance.lock().unwrap() = VecDeque::from([Ok(free)]);
    }

    pub fn fail_balance(&self) {
        *self.balance.lock().unwrap() =
            VecDeque::from([Err(BotError::TransientNetwork("account endpoint down".into()))]);
    }

    pub fn push_buy(&self, reply: Result<Fill>) {
        self.buy_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_sell(&self, reply: Result<Fill>) {
        self.sell_replies.lock().unwrap().push_back(reply);
    }

    pub fn buy_count(&self) -> usize {
        self.buys.lock().unwrap().len()
    }

    pub fn sell_orders(&self) -> Vec<(String, Decimal)> {
        self.sells.lock().unwrap().clone()
    }

    fn last_price(&self, symbol: &str) -> Decimal {
        self.tickers
            .lock()
            .unwrap()
            .get(symbol)
            .and_then(|s| s.front().cloned())
            .and_then(|r| r.ok())
            .map(|t| t.last_price)
            .unwrap_or_default()
    }
}

#[async_trait]
impl MarketDataClient for FakeExchange {
    async fn get_ticker(&self, symbol: &str) -> Result<TickerSnapshot> {
        let mut tickers = self.tickers.lock().unwrap();
        tickers
            .get_mut(symbol)
            .and_then(next_reply)
            .unwrap_or_else(|| Err(BotError::TransientNetwork(format!("no quote for {symbol}"))))
    }

    async fn get_symbol_filters(&self, symbol: &str) -> Result<SymbolFilters> {
        self.filter_calls.fetch_add(1, Ordering::SeqCst);
        self.filters
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| Err(BotError::Configuration(format!("unknown symbol {symbol}"))))
    }
}

#[async_trait]
impl AccountClient for FakeExchange {
    async fn get_free_balance(&self, _asset: &str) -> Result<Decimal> {
        let mut script = self.balance.lock().unwrap();
        next_reply(&mut *script).unwrap_or(Ok(Decimal::ZERO))
    }
}

#[async_trait]
impl ExecutionClient for FakeExchange {
    async fn place_market_buy(&self, symbol: &str, quantity: Decimal) -> Result<Fill> {
        self.buys.lock().unwrap().push((symbol.to_string(), quantity));
        let scripted = self.buy_replies.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(Fill {
                filled_qty: quantity,
                avg_price: self.last_price(symbol),
            })
        })
    }

    async fn place_market_sell(&self, symbol: &str, quantity: Decimal) -> Result<Fill> {
        self.sells.lock().unwrap().push((symbol.to_string(), quantity));
        let scripted = self.sell_replies.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(Fill {
                filled_qty: quantity,
                avg_price: self.last_price(symbol),
            })
        })
    }
}

/// Clock that moves forward by exactly the slept duration.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    pub sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
    }
}

/// Journal that keeps events in memory.
#[derive(Default)]
pub struct MemoryJournal {
    pub events: Mutex<Vec<TradeEvent>>,
}

impl MemoryJournal {
    pub fn events(&self) -> Vec<TradeEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradeJournal for MemoryJournal {
    async fn record(&self, event: &TradeEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
