// src/connectors/messages.rs
use serde::Deserialize;

/// GET /api/v3/ticker/24hr?symbol=<symbol>
/// Only the fields the bot reads are mapped.
#[derive(Debug, Deserialize)]
pub struct Ticker24hr {
    pub symbol: String,

    #[serde(rename = "priceChangePercent")]
    pub price_change_percent: String,

    #[serde(rename = "lastPrice")]
    pub last_price: String,
}

/// GET /api/v3/exchangeInfo?symbol=<symbol>
#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "LOT_SIZE")]
    LotSize {
        #[serde(rename = "minQty")]
        min_qty: String,
        #[serde(rename = "stepSize")]
        step_size: String,
    },
    #[serde(rename = "PRICE_FILTER")]
    PriceFilter {
        #[serde(rename = "tickSize")]
        tick_size: String,
    },
    #[serde(other)]
    Other,
}

/// GET /api/v3/account (signed)
#[derive(Debug, Deserialize)]
pub struct AccountInfo {
    pub balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    pub free: String,
}

/// POST /api/v3/order with newOrderRespType=FULL
#[derive(Debug, Deserialize)]
pub struct OrderFull {
    pub symbol: String,

    #[serde(rename = "orderId")]
    pub order_id: u64,

    pub status: String,

    #[serde(rename = "executedQty")]
    pub executed_qty: String,

    #[serde(rename = "cummulativeQuoteQty")]
    pub cummulative_quote_qty: String,

    #[serde(default)]
    pub fills: Vec<OrderFill>,
}

#[derive(Debug, Deserialize)]
pub struct OrderFill {
    pub price: String,
    pub qty: String,
    #[serde(default)]
    pub commission: String,
    #[serde(rename = "commissionAsset", default)]
    pub commission_asset: String,
}

/// Error body returned with 4xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: i64,
    pub msg: String,
}
