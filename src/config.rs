// src/config.rs

use crate::connectors::binance::DEFAULT_BASE_URL;
use crate::core::engine::EngineSettings;
use crate::core::retry::RetryPolicy;
use crate::types::Basket;
use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::time::Duration;

fn default_basket() -> Vec<String> {
    [
        "BTCUSDT", "ETHUSDT", "BNBUSDT", "XRPUSDT", "ADAUSDT", "SOLUSDT", "DOGEUSDT", "MATICUSDT",
        "DOTUSDT", "AVAXUSDT", "LTCUSDT", "LINKUSDT",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TradingConfig {
    pub basket: Vec<String>,
    pub quote_asset: String,
    pub invest_fraction: Decimal,
    pub min_trade_balance: Decimal,
    pub target_gain_factor: Decimal,
    pub overspend_factor: Decimal,
    pub poll_interval_ms: u64,
    pub cycle_delay_ms: u64,
    pub retry_delay_ms: u64,
    pub backoff_multiplier: u32,
    pub max_retry_delay_ms: u64,
    // Optional hold bounds, both off unless set
    pub max_hold_secs: Option<u64>,
    pub stop_loss_factor: Option<Decimal>,
    /// Starting quote balance when paper trading.
    pub paper_balance: Decimal,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            basket: default_basket(),
            quote_asset: "USDT".to_string(),
            invest_fraction: dec!(0.5),
            min_trade_balance: dec!(10),
            target_gain_factor: dec!(1.003),
            overspend_factor: Decimal::ONE,
            poll_interval_ms: 1000,
            cycle_delay_ms: 1000,
            retry_delay_ms: 1000,
            backoff_multiplier: 1,
            max_retry_delay_ms: 30_000,
            max_hold_secs: None,
            stop_loss_factor: None,
            paper_balance: dec!(1000),
        }
    }
}

impl TradingConfig {
    pub fn basket(&self) -> Basket {
        Basket::new(self.basket.iter().cloned())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            quote_asset: self.quote_asset.clone(),
            invest_fraction: self.invest_fraction,
            min_trade_balance: self.min_trade_balance,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            cycle_delay: Duration::from_millis(self.cycle_delay_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            max_retry_delay: Duration::from_millis(self.max_retry_delay_ms),
        }
    }

    pub fn max_hold(&self) -> Option<Duration> {
        self.max_hold_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub trade_log: String,
    pub state_file: String,
    /// Paper runs keep their own snapshot so a simulated position is never
    /// resumed against the real account.
    pub paper_state_file: String,
}

impl StorageConfig {
    pub fn state_path(&self, live_trading: bool) -> &str {
        if live_trading {
            &self.state_file
        } else {
            &self.paper_state_file
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            trade_log: "trade_events.log".to_string(),
            state_file: "bot_state.json".to_string(),
            paper_state_file: "paper_state.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            file_name: "rotation_bot.log".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub live_trading: bool,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// `APP_` once, then `__` between nesting levels.
fn environment() -> Environment {
    Environment::with_prefix("APP")
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("trading.basket")
        .try_parsing(true)
}

impl AppConfig {
    /// `Settings.{toml,yaml,json}` if present, then `APP_` variables
    /// (`APP_TRADING__TARGET_GAIN_FACTOR=1.005`).
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("Settings").required(false))
            .add_source(environment());

        let mut config: AppConfig = builder.build()?.try_deserialize()?;

        // Credentials keep their conventional names.
        if config.api_key.is_empty() {
            config.api_key = std::env::var("BINANCE_API_KEY").unwrap_or_default();
        }
        if config.secret_key.is_empty() {
            config.secret_key = std::env::var("BINANCE_SECRET_KEY").unwrap_or_default();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.trading;
        if t.basket().is_empty() {
            return Err(ConfigError::Message("trading.basket must not be empty".into()));
        }
        if t.invest_fraction <= Decimal::ZERO || t.invest_fraction > Decimal::ONE {
            return Err(ConfigError::Message(
                "trading.invest_fraction must be in (0, 1]".into(),
            ));
        }
        if t.target_gain_factor <= Decimal::ONE {
            return Err(ConfigError::Message(
                "trading.target_gain_factor must be greater than 1".into(),
            ));
        }
        if t.overspend_factor < Decimal::ONE {
            return Err(ConfigError::Message(
                "trading.overspend_factor must be at least 1".into(),
            ));
        }
        if let Some(stop) = t.stop_loss_factor {
            if stop <= Decimal::ZERO || stop >= Decimal::ONE {
                return Err(ConfigError::Message(
                    "trading.stop_loss_factor must be in (0, 1)".into(),
                ));
            }
        }
        if t.poll_interval_ms == 0 || t.cycle_delay_ms == 0 || t.retry_delay_ms == 0 {
            return Err(ConfigError::Message("delays must be non-zero".into()));
        }
        if self.live_trading && (self.api_key.is_empty() || self.secret_key.is_empty()) {
            return Err(ConfigError::Message(
                "live trading requires BINANCE_API_KEY and BINANCE_SECRET_KEY".into(),
            ));
        }
        Ok(())
    }
}
