// src/utils/precision.rs
use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a quantity DOWN to the nearest multiple of step_size.
/// Example: amount=10.999, step=1.0 -> 10
pub fn normalize_quantity(amount: Decimal, step_size: Decimal) -> Decimal {
    if step_size.is_zero() {
        return amount;
    }
    let steps = (amount / step_size).floor();
    (steps * step_size).round_dp_with_strategy(decimal_places(step_size), RoundingStrategy::ToZero)
}

/// Rounds a quantity UP to the nearest multiple of step_size.
pub fn ceil_to_step(amount: Decimal, step_size: Decimal) -> Decimal {
    if step_size.is_zero() {
        return amount;
    }
    let steps = (amount / step_size).ceil();
    (steps * step_size).round_dp(decimal_places(step_size))
}

/// Rounds a price to the NEAREST multiple of tick_size.
/// Example: price=100.16, tick=0.1 -> 100.2
pub fn normalize_price(price: Decimal, tick_size: Decimal) -> Decimal {
    if tick_size.is_zero() {
        return price;
    }
    ((price / tick_size).round() * tick_size).round_dp(decimal_places(tick_size))
}

/// Number of significant fractional digits of an increment.
///
/// Computed from the value, so "0.00100000" -> 3, "0.00500000" -> 3,
/// "1.00000000" -> 0, "10" -> 0.
pub fn decimal_places(increment: Decimal) -> u32 {
    increment.normalize().scale()
}

/// True when `amount` is a whole number of steps.
pub fn is_step_aligned(amount: Decimal, step_size: Decimal) -> bool {
    if step_size.is_zero() {
        return true;
    }
    (amount % step_size).is_zero()
}
