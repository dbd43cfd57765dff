// src/core/retry.rs
use crate::types::Phase;
use std::time::Duration;

/// Which failure regime a phase belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    /// No position at risk: a failure defers to the next cycle.
    Cycle,
    /// A position is held: keep retrying, never give up.
    Position,
}

impl From<Phase> for Regime {
    fn from(phase: Phase) -> Self {
        if phase.holds_position() {
            Regime::Position
        } else {
            Regime::Cycle
        }
    }
}

/// What the last engine step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Moved to a new phase.
    Advanced,
    /// Nothing to do yet (low balance, price below target).
    Waiting,
    /// The step's network call or order failed.
    Failed,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub cycle_delay: Duration,
    pub poll_interval: Duration,
    pub retry_delay: Duration,
    pub backoff_multiplier: u32,
    pub max_retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            cycle_delay: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
            retry_delay: Duration::from_secs(1),
            backoff_multiplier: 1,
            max_retry_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next step, given the phase the engine is now in.
    ///
    /// `consecutive_failures` counts failed steps in a row, including the
    /// one just reported.
    pub fn next_delay(&self, phase: Phase, outcome: StepOutcome, consecutive_failures: u32) -> Duration {
        match (outcome, Regime::from(phase)) {
            (StepOutcome::Failed, Regime::Cycle) => self.cycle_delay,
            (StepOutcome::Failed, Regime::Position) => self.position_backoff(consecutive_failures),
            (StepOutcome::Advanced, _) if matches!(phase, Phase::Opening | Phase::Closing) => {
                Duration::ZERO
            }
            (_, _) => match phase {
                Phase::Monitoring => self.poll_interval,
                _ => self.cycle_delay,
            },
        }
    }

    /// Position-level failures never stop retrying; the delay only grows.
    fn position_backoff(&self, consecutive_failures: u32) -> Duration {
        let exponent = consecutive_failures.saturating_sub(1);
        let factor = self.backoff_multiplier.max(1).saturating_pow(exponent);
        self.retry_delay
            .checked_mul(factor)
            .unwrap_or(self.max_retry_delay)
            .min(self.max_retry_delay.max(self.retry_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(multiplier: u32) -> RetryPolicy {
        RetryPolicy {
            cycle_delay: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(500),
            retry_delay: Duration::from_millis(200),
            backoff_multiplier: multiplier,
            max_retry_delay: Duration::from_millis(1500),
        }
    }

    #[test]
    fn regimes_follow_position_ownership() {
        assert_eq!(Regime::from(Phase::Idle), Regime::Cycle);
        assert_eq!(Regime::from(Phase::Opening), Regime::Cycle);
        assert_eq!(Regime::from(Phase::Monitoring), Regime::Position);
        assert_eq!(Regime::from(Phase::Closing), Regime::Position);
    }

    #[test]
    fn entering_opening_or_closing_runs_immediately() {
        let p = policy(1);
        assert_eq!(p.next_delay(Phase::Opening, StepOutcome::Advanced, 0), Duration::ZERO);
        assert_eq!(p.next_delay(Phase::Closing, StepOutcome::Advanced, 0), Duration::ZERO);
        assert_eq!(p.next_delay(Phase::Monitoring, StepOutcome::Advanced, 0), p.poll_interval);
        assert_eq!(p.next_delay(Phase::Idle, StepOutcome::Advanced, 0), p.cycle_delay);
    }

    #[test]
    fn cycle_failures_defer_a_fixed_tick() {
        let p = policy(2);
        assert_eq!(p.next_delay(Phase::Idle, StepOutcome::Failed, 1), p.cycle_delay);
        assert_eq!(p.next_delay(Phase::Idle, StepOutcome::Failed, 9), p.cycle_delay);
    }

    #[test]
    fn position_failures_use_fixed_delay_by_default() {
        let p = policy(1);
        for n in 1..20 {
            assert_eq!(p.next_delay(Phase::Closing, StepOutcome::Failed, n), p.retry_delay);
        }
    }

    #[test]
    fn position_backoff_grows_and_caps() {
        let p = policy(2);
        let delays: Vec<u128> = (1..=5)
            .map(|n| p.next_delay(Phase::Monitoring, StepOutcome::Failed, n).as_millis())
            .collect();
        assert_eq!(delays, [200, 400, 800, 1500, 1500]);
        assert_eq!(
            p.next_delay(Phase::Closing, StepOutcome::Failed, u32::MAX),
            Duration::from_millis(1500)
        );
    }
}
