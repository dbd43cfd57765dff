// src/types.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered candidate set. Order is the tie-break order during selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Basket {
    symbols: Vec<String>,
}

impl Basket {
    /// Builds a basket, dropping blank entries and repeated symbols (first wins).
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for s in symbols {
            let s = s.into().trim().to_uppercase();
            if !s.is_empty() && !out.contains(&s) {
                out.push(s);
            }
        }
        Self { symbols: out }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSnapshot {
    pub symbol: String,
    pub last_price: Decimal,
    pub percent_change_24h: Decimal,
}

/// Raw LOT_SIZE / PRICE_FILTER values as the exchange reports them.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolFilters {
    pub symbol: String,
    pub min_qty: String,
    pub step_size: String,
    pub tick_size: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolConstraints {
    pub symbol: String,
    pub min_qty: Decimal,
    pub step_size: Decimal,
    pub tick_size: Decimal,
    /// Fractional digits allowed in an order quantity.
    pub quantity_precision: u32,
    /// Fractional digits allowed in a price.
    pub price_precision: u32,
}

/// Execution report for a market order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub filled_qty: Decimal,
    pub avg_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Opening,
    Monitoring,
    Closing,
}

impl Phase {
    pub fn holds_position(self) -> bool {
        matches!(self, Phase::Monitoring | Phase::Closing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
    Error,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
            TradeAction::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// One line of the append-only trade log.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub timestamp: DateTime<Utc>,
    pub action: TradeAction,
    pub symbol: String,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} qty={} price={}",
            self.timestamp.to_rfc3339(),
            self.action,
            self.symbol,
            self.quantity.normalize(),
            self.price.normalize()
        )
    }
}

/// Why a held position is being liquidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TargetReached,
    StopLoss,
    MaxHoldExceeded,
}
