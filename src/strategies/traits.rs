// src/strategies/traits.rs
use crate::types::{ExitReason, Position, TickerSnapshot};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

pub trait Strategy: Send + Sync {
    fn name(&self) -> String;

    /// Picks the candidate to open. `candidates` is in basket order.
    fn select<'a>(&self, candidates: &'a [TickerSnapshot]) -> Option<&'a TickerSnapshot>;

    /// Price at which a position opened at `entry_price` is taken profit on.
    fn target_price(&self, entry_price: Decimal) -> Decimal;

    /// Decides whether the held position should be liquidated now.
    fn exit_signal(
        &self,
        position: &Position,
        current_price: Decimal,
        now: DateTime<Utc>,
    ) -> Option<ExitReason>;
}
