// src/connectors/paper.rs
use crate::connectors::traits::{AccountClient, ExecutionClient, MarketDataClient};
use crate::errors::{BotError, Result};
use crate::types::{Fill, Position};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Simulated account: fills market orders at the live last price against an
/// in-memory balance book. Market data still comes from the real feed.
pub struct PaperExchange {
    market: Arc<dyn MarketDataClient>,
    quote_asset: String,
    balances: Mutex<HashMap<String, Decimal>>,
}

impl PaperExchange {
    pub fn new(market: Arc<dyn MarketDataClient>, quote_asset: &str, initial_quote: Decimal) -> Self {
        let mut balances = HashMap::new();
        balances.insert(quote_asset.to_string(), initial_quote);
        Self {
            market,
            quote_asset: quote_asset.to_string(),
            balances: Mutex::new(balances),
        }
    }

    fn base_asset<'a>(&self, symbol: &'a str) -> Result<&'a str> {
        symbol
            .strip_suffix(self.quote_asset.as_str())
            .filter(|base| !base.is_empty())
            .ok_or_else(|| {
                BotError::Configuration(format!("{symbol} is not quoted in {}", self.quote_asset))
            })
    }

    fn book(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Decimal>>> {
        self.balances
            .lock()
            .map_err(|_| BotError::Storage("paper balance book poisoned".to_string()))
    }

    /// Credits the base asset of a position carried over from a previous
    /// paper run, so the resumed sell has holdings to draw from.
    pub fn seed_position(&self, position: &Position) -> Result<()> {
        let base = self.base_asset(&position.symbol)?.to_string();
        *self.book()?.entry(base.clone()).or_default() += position.quantity;
        info!(
            symbol = %position.symbol,
            asset = %base,
            quantity = %position.quantity,
            "Paper book seeded from saved position"
        );
        Ok(())
    }

    pub fn balance_of(&self, asset: &str) -> Decimal {
        self.book()
            .ok()
            .and_then(|b| b.get(asset).copied())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AccountClient for PaperExchange {
    async fn get_free_balance(&self, asset: &str) -> Result<Decimal> {
        Ok(self.book()?.get(asset).copied().unwrap_or_default())
    }
}

#[async_trait]
impl ExecutionClient for PaperExchange {
    async fn place_market_buy(&self, symbol: &str, quantity: Decimal) -> Result<Fill> {
        let base = self.base_asset(symbol)?.to_string();
        let price = self.market.get_ticker(symbol).await?.last_price;
        let cost = quantity * price;

        let mut book = self.book()?;
        let quote = book.entry(self.quote_asset.clone()).or_default();
        if *quote < cost {
            return Err(BotError::rejection(format!(
                "paper account has {} {}, order needs {}",
                quote, self.quote_asset, cost
            )));
        }
        *quote -= cost;
        *book.entry(base).or_default() += quantity;

        info!(symbol, %quantity, %price, "Paper buy filled");
        Ok(Fill {
            filled_qty: quantity,
            avg_price: price,
        })
    }

    async fn place_market_sell(&self, symbol: &str, quantity: Decimal) -> Result<Fill> {
        let base = self.base_asset(symbol)?.to_string();
        let price = self.market.get_ticker(symbol).await?.last_price;

        let mut book = self.book()?;
        let held = book.entry(base.clone()).or_default();
        if *held < quantity {
            return Err(BotError::rejection(format!(
                "paper account holds {} {}, sell needs {}",
                held, base, quantity
            )));
        }
        *held -= quantity;
        *book.entry(self.quote_asset.clone()).or_default() += quantity * price;

        info!(symbol, %quantity, %price, "Paper sell filled");
        Ok(Fill {
            filled_qty: quantity,
            avg_price: price,
        })
    }
}
