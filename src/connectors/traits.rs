use crate::errors::Result;
use crate::types::{Fill, SymbolFilters, TickerSnapshot};
use async_trait::async_trait;
use rust_decimal::Decimal;

#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Last price and 24h percent change.
    async fn get_ticker(&self, symbol: &str) -> Result<TickerSnapshot>;

    /// Quantization rules as reported by the exchange.
    async fn get_symbol_filters(&self, symbol: &str) -> Result<SymbolFilters>;
}

#[async_trait]
pub trait AccountClient: Send + Sync {
    async fn get_free_balance(&self, asset: &str) -> Result<Decimal>;
}

#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn place_market_buy(&self, symbol: &str, quantity: Decimal) -> Result<Fill>;

    async fn place_market_sell(&self, symbol: &str, quantity: Decimal) -> Result<Fill>;
}
