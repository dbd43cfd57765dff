// src/market/provider.rs
use crate::connectors::traits::MarketDataClient;
use crate::errors::{BotError, Result};
use crate::types::{Basket, TickerSnapshot};
use std::sync::Arc;
use tracing::{debug, warn};

/// Current quotes for single symbols or a whole basket.
pub struct MarketSnapshotProvider {
    client: Arc<dyn MarketDataClient>,
}

impl MarketSnapshotProvider {
    pub fn new(client: Arc<dyn MarketDataClient>) -> Self {
        Self { client }
    }

    pub async fn get_snapshot(&self, symbol: &str) -> Result<TickerSnapshot> {
        self.client.get_ticker(symbol).await
    }

    /// Fetches every basket member in order. Members that fail are logged and
    /// left out; the call only fails when nothing could be fetched.
    pub async fn get_basket_snapshots(&self, basket: &Basket) -> Result<Vec<TickerSnapshot>> {
        let mut snapshots = Vec::with_capacity(basket.len());

        for symbol in basket.symbols() {
            match self.client.get_ticker(symbol).await {
                Ok(snapshot) => {
                    debug!(
                        symbol = %snapshot.symbol,
                        price = %snapshot.last_price,
                        change = %snapshot.percent_change_24h,
                        "Snapshot"
                    );
                    snapshots.push(snapshot);
                }
                Err(e) => warn!(symbol = %symbol, operation = "get_ticker", "Excluding symbol: {}", e),
            }
        }

        if snapshots.is_empty() {
            return Err(BotError::NoDataAvailable);
        }
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeExchange;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn failed_members_are_excluded() {
        let fake = Arc::new(FakeExchange::new());
        fake.set_ticker("BTCUSDT", dec!(60000), dec!(-2));
        fake.fail_ticker("ETHUSDT");
        fake.set_ticker("BNBUSDT", dec!(500), dec!(1));
        let provider = MarketSnapshotProvider::new(fake);

        let basket = Basket::new(["BTCUSDT", "ETHUSDT", "BNBUSDT"]);
        let snapshots = provider.get_basket_snapshots(&basket).await.unwrap();
        let symbols: Vec<&str> = snapshots.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, ["BTCUSDT", "BNBUSDT"]);
    }

    #[tokio::test]
    async fn all_failures_mean_no_data() {
        let fake = Arc::new(FakeExchange::new());
        fake.fail_ticker("BTCUSDT");
        fake.fail_ticker("ETHUSDT");
        let provider = MarketSnapshotProvider::new(fake);

        let basket = Basket::new(["BTCUSDT", "ETHUSDT"]);
        assert_eq!(
            provider.get_basket_snapshots(&basket).await,
            Err(BotError::NoDataAvailable)
        );
        assert_eq!(
            provider.get_basket_snapshots(&Basket::default()).await,
            Err(BotError::NoDataAvailable)
        );
    }

    #[tokio::test]
    async fn single_snapshot_surfaces_transient_errors() {
        let fake = Arc::new(FakeExchange::new());
        fake.fail_ticker("ETHUSDT");
        let provider = MarketSnapshotProvider::new(fake);

        let err = provider.get_snapshot("ETHUSDT").await.unwrap_err();
        assert!(err.is_transient());
    }
}
