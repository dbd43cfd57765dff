// src/storage/mod.rs
pub mod state;

pub use state::{PersistedState, StateStore};

use crate::errors::Result;
use crate::types::TradeEvent;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Append-only sink for trade events.
#[async_trait]
pub trait TradeJournal: Send + Sync {
    async fn record(&self, event: &TradeEvent) -> Result<()>;
}

/// Writes one line per event to a text file, creating it on first use.
pub struct FileJournal {
    path: PathBuf,
}

impl FileJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TradeJournal for FileJournal {
    async fn record(&self, event: &TradeEvent) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{event}\n").as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TradeAction;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn events_are_appended_line_by_line() {
        let path = std::env::temp_dir().join(format!("journal-{}.log", uuid::Uuid::new_v4()));
        let journal = FileJournal::new(&path);
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        for (action, price) in [(TradeAction::Buy, dec!(2000)), (TradeAction::Sell, dec!(2006))] {
            journal
                .record(&TradeEvent {
                    timestamp: at,
                    action,
                    symbol: "ETHUSDT".to_string(),
                    quantity: dec!(0.025),
                    price,
                })
                .await
                .unwrap();
        }

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("BUY ETHUSDT qty=0.025 price=2000"));
        assert!(lines[1].contains("SELL ETHUSDT qty=0.025 price=2006"));

        let _ = tokio::fs::remove_file(&path).await;
    }
}
