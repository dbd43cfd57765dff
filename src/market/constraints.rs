// src/market/constraints.rs
use crate::connectors::traits::MarketDataClient;
use crate::errors::{BotError, Result};
use crate::types::{SymbolConstraints, SymbolFilters};
use crate::utils::precision::decimal_places;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Per-symbol order quantization rules, fetched once and kept for the life
/// of the process unless explicitly refreshed.
pub struct SymbolConstraintRegistry {
    client: Arc<dyn MarketDataClient>,
    cache: HashMap<String, SymbolConstraints>,
}

impl SymbolConstraintRegistry {
    pub fn new(client: Arc<dyn MarketDataClient>) -> Self {
        Self {
            client,
            cache: HashMap::new(),
        }
    }

    pub async fn get_constraints(&mut self, symbol: &str) -> Result<SymbolConstraints> {
        if let Some(cached) = self.cache.get(symbol) {
            return Ok(cached.clone());
        }
        self.fetch(symbol).await
    }

    /// Drops the cached entry and fetches it again.
    pub async fn refresh(&mut self, symbol: &str) -> Result<SymbolConstraints> {
        self.invalidate(symbol);
        self.fetch(symbol).await
    }

    pub fn invalidate(&mut self, symbol: &str) {
        self.cache.remove(symbol);
    }

    async fn fetch(&mut self, symbol: &str) -> Result<SymbolConstraints> {
        let filters = self.client.get_symbol_filters(symbol).await?;
        let constraints = parse_constraints(&filters)?;
        info!(
            symbol,
            min_qty = %constraints.min_qty,
            step_size = %constraints.step_size,
            tick_size = %constraints.tick_size,
            "Cached symbol constraints"
        );
        self.cache.insert(symbol.to_string(), constraints.clone());
        Ok(constraints)
    }
}

fn parse_field(symbol: &str, name: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim())
        .map_err(|e| BotError::Configuration(format!("{symbol}: {name} '{raw}' is not a decimal: {e}")))
}

/// Validates raw filter strings and derives precisions from their values.
pub fn parse_constraints(filters: &SymbolFilters) -> Result<SymbolConstraints> {
    let symbol = filters.symbol.as_str();
    let min_qty = parse_field(symbol, "minQty", &filters.min_qty)?;
    let step_size = parse_field(symbol, "stepSize", &filters.step_size)?;
    let tick_size = parse_field(symbol, "tickSize", &filters.tick_size)?;

    if min_qty.is_sign_negative() {
        return Err(BotError::Configuration(format!("{symbol}: negative minQty {min_qty}")));
    }
    if step_size <= Decimal::ZERO {
        return Err(BotError::Configuration(format!("{symbol}: stepSize must be positive")));
    }
    if tick_size <= Decimal::ZERO {
        return Err(BotError::Configuration(format!("{symbol}: tickSize must be positive")));
    }

    let constraints = SymbolConstraints {
        symbol: symbol.to_string(),
        min_qty: min_qty.normalize(),
        step_size: step_size.normalize(),
        tick_size: tick_size.normalize(),
        quantity_precision: decimal_places(step_size),
        price_precision: decimal_places(tick_size),
    };
    debug!(?constraints, "Parsed filters");
    Ok(constraints)
}
