use crate::strategies::traits::Strategy;
use crate::types::{ExitReason, Position, TickerSnapshot};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;

/// Buys the basket's worst 24h performer and sells at a fixed gain.
pub struct WorstPerformerRotation {
    target_gain_factor: Decimal,
    stop_loss_factor: Option<Decimal>,
    max_hold: Option<Duration>,
}

impl WorstPerformerRotation {
    /// # Arguments
    /// * `target_gain_factor` - Multiplier on the entry price that triggers a SELL (e.g. 1.003).
    pub fn new(target_gain_factor: Decimal) -> Self {
        Self {
            target_gain_factor,
            stop_loss_factor: None,
            max_hold: None,
        }
    }

    /// Sell when price falls to `entry * factor` (e.g. 0.95).
    pub fn with_stop_loss(mut self, factor: Option<Decimal>) -> Self {
        self.stop_loss_factor = factor;
        self
    }

    /// Sell once the position has been held this long, whatever the price.
    pub fn with_max_hold(mut self, max_hold: Option<Duration>) -> Self {
        self.max_hold = max_hold;
        self
    }
}

impl Strategy for WorstPerformerRotation {
    fn name(&self) -> String {
        "worst-performer-rotation".to_string()
    }

    fn select<'a>(&self, candidates: &'a [TickerSnapshot]) -> Option<&'a TickerSnapshot> {
        let mut best: Option<&'a TickerSnapshot> = None;
        for candidate in candidates {
            // Strict comparison keeps the earliest entry on ties.
            match best {
                Some(b) if b.percent_change_24h <= candidate.percent_change_24h => {}
                _ => best = Some(candidate),
            }
        }
        best
    }

    fn target_price(&self, entry_price: Decimal) -> Decimal {
        entry_price * self.target_gain_factor
    }

    fn exit_signal(
        &self,
        position: &Position,
        current_price: Decimal,
        now: DateTime<Utc>,
    ) -> Option<ExitReason> {
        if current_price >= self.target_price(position.entry_price) {
            return Some(ExitReason::TargetReached);
        }
        if let Some(factor) = self.stop_loss_factor {
            if current_price <= position.entry_price * factor {
                return Some(ExitReason::StopLoss);
            }
        }
        if let Some(max_hold) = self.max_hold {
            let held = (now - position.opened_at).to_std().unwrap_or_default();
            if held >= max_hold {
                return Some(ExitReason::MaxHoldExceeded);
            }
        }
        None
    }
}
