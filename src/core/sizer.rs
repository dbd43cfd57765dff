// src/core/sizer.rs
use crate::errors::{BotError, Result};
use crate::types::SymbolConstraints;
use crate::utils::precision::{ceil_to_step, normalize_quantity};
use rust_decimal::Decimal;

/// Turns a notional budget into an order quantity the exchange will accept.
#[derive(Debug, Clone, Copy)]
pub struct PositionSizer {
    /// Maximum ratio of order notional to the requested budget. 1.0 means the
    /// budget is a hard cap.
    overspend_factor: Decimal,
}

impl Default for PositionSizer {
    fn default() -> Self {
        Self {
            overspend_factor: Decimal::ONE,
        }
    }
}

impl PositionSizer {
    pub fn new(overspend_factor: Decimal) -> Self {
        Self { overspend_factor }
    }

    /// Floors `invest / price` to the step grid and lifts it to the exchange
    /// minimum. Fails instead of exceeding `invest * overspend_factor`.
    pub fn compute_order_quantity(
        &self,
        invest_amount: Decimal,
        price: Decimal,
        constraints: &SymbolConstraints,
    ) -> Result<Decimal> {
        if price <= Decimal::ZERO {
            return Err(BotError::Configuration(format!(
                "{}: cannot size against price {}",
                constraints.symbol, price
            )));
        }
        let allowed = invest_amount
            .checked_mul(self.overspend_factor)
            .ok_or_else(|| overflow(constraints, "invest * overspend_factor"))?;
        if invest_amount <= Decimal::ZERO {
            return Err(BotError::InsufficientFunds {
                required: Decimal::ZERO,
                allowed,
            });
        }

        let raw = invest_amount
            .checked_div(price)
            .ok_or_else(|| overflow(constraints, "invest / price"))?;
        let floored = normalize_quantity(raw, constraints.step_size);
        // Exchanges may report a minimum that sits between steps.
        let min_qty = ceil_to_step(constraints.min_qty, constraints.step_size);
        let quantity = floored.max(min_qty);

        let required = quantity
            .checked_mul(price)
            .ok_or_else(|| overflow(constraints, "quantity * price"))?;
        if quantity.is_zero() || required > allowed {
            return Err(BotError::InsufficientFunds { required, allowed });
        }
        Ok(quantity.normalize())
    }
}

fn overflow(constraints: &SymbolConstraints, what: &str) -> BotError {
    BotError::Configuration(format!("{}: {} overflows", constraints.symbol, what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::precision::is_step_aligned;
    use rust_decimal_macros::dec;

    fn constraints(min_qty: Decimal, step_size: Decimal) -> SymbolConstraints {
        SymbolConstraints {
            symbol: "ETHUSDT".to_string(),
            min_qty,
            step_size,
            tick_size: dec!(0.01),
            quantity_precision: step_size.normalize().scale(),
            price_precision: 2,
        }
    }

    #[test]
    fn half_of_hundred_at_two_thousand_buys_point_zero_two_five() {
        let balance = dec!(100);
        let invest = balance * dec!(0.5);
        let qty = PositionSizer::default()
            .compute_order_quantity(invest, dec!(2000), &constraints(dec!(0.001), dec!(0.0001)))
            .unwrap();
        assert_eq!(invest, dec!(50));
        assert_eq!(qty, dec!(0.025));
    }

    #[test]
    fn quantity_is_floored_never_rounded_up() {
        let qty = PositionSizer::default()
            .compute_order_quantity(dec!(50), dec!(3000), &constraints(dec!(0.001), dec!(0.001)))
            .unwrap();
        // 50 / 3000 = 0.016666...
        assert_eq!(qty, dec!(0.016));
        assert!(qty * dec!(3000) <= dec!(50));
    }

    #[test]
    fn clamping_to_minimum_that_overspends_is_rejected() {
        let err = PositionSizer::default()
            .compute_order_quantity(dec!(5), dec!(2000), &constraints(dec!(0.01), dec!(0.0001)))
            .unwrap_err();
        assert_eq!(
            err,
            BotError::InsufficientFunds {
                required: dec!(20),
                allowed: dec!(5)
            }
        );
    }

    #[test]
    fn overspend_factor_permits_minimum_clamp() {
        let qty = PositionSizer::new(dec!(5))
            .compute_order_quantity(dec!(5), dec!(2000), &constraints(dec!(0.01), dec!(0.0001)))
            .unwrap();
        assert_eq!(qty, dec!(0.01));
    }

    #[test]
    fn off_grid_minimum_is_lifted_to_the_next_step() {
        let qty = PositionSizer::new(dec!(2))
            .compute_order_quantity(dec!(1), dec!(1), &constraints(dec!(1.5), dec!(1)))
            .unwrap();
        assert_eq!(qty, dec!(2));
    }

    #[test]
    fn bad_inputs_are_refused() {
        let c = constraints(dec!(0.001), dec!(0.001));
        let sizer = PositionSizer::default();
        assert!(matches!(
            sizer.compute_order_quantity(dec!(50), Decimal::ZERO, &c),
            Err(BotError::Configuration(_))
        ));
        assert!(matches!(
            sizer.compute_order_quantity(Decimal::ZERO, dec!(10), &c),
            Err(BotError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn extreme_values_fail_instead_of_panicking() {
        let c = constraints(dec!(0.001), dec!(0.001));
        assert!(matches!(
            PositionSizer::new(Decimal::MAX).compute_order_quantity(dec!(50), dec!(2000), &c),
            Err(BotError::Configuration(_))
        ));
        assert!(matches!(
            PositionSizer::default().compute_order_quantity(Decimal::MAX, dec!(0.0001), &c),
            Err(BotError::Configuration(_))
        ));
    }

    #[test]
    fn accepted_quantities_respect_minimum_and_step() {
        let grids = [
            (dec!(0.001), dec!(0.0001)),
            (dec!(0.1), dec!(0.1)),
            (dec!(1), dec!(1)),
            (dec!(0.00001), dec!(0.00001)),
        ];
        let budgets = [dec!(10), dec!(37.5), dec!(123.45), dec!(999.99)];
        let prices = [dec!(0.3127), dec!(7.77), dec!(2000), dec!(61234.56)];
        let sizer = PositionSizer::default();

        for (min_qty, step) in grids {
            let c = constraints(min_qty, step);
            for invest in budgets {
                for price in prices {
                    let Ok(q) = sizer.compute_order_quantity(invest, price, &c) else {
                        continue;
                    };
                    assert!(q >= min_qty, "{q} < {min_qty}");
                    assert!(is_step_aligned(q, step), "{q} not on {step}");
                    assert!(q * price <= invest);
                    assert_eq!(sizer.compute_order_quantity(invest, price, &c), Ok(q));
                }
            }
        }
    }
}
