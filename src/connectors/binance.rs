// src/connectors/binance.rs
use crate::connectors::messages::{
    AccountInfo, ApiError, ExchangeInfo, OrderFull, SymbolFilter, Ticker24hr,
};
use crate::connectors::traits::{AccountClient, ExecutionClient, MarketDataClient};
use crate::errors::{BotError, Result};
use crate::types::{Fill, SymbolFilters, TickerSnapshot};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, Response, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Binance spot REST connector. One instance serves market data, account
/// and execution calls.
pub struct BinanceClient {
    api_key: String,
    secret_key: String,
    http_client: Client,
    base_rest_url: String,
}

impl BinanceClient {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self::with_base_url(api_key, secret_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, secret_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            secret_key,
            http_client: Client::new(),
            base_rest_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn sign_and_build_query(&self, params: Vec<(&str, String)>) -> Result<String> {
        let mut params = params;
        let timestamp = Utc::now().timestamp_millis().to_string();
        params.push(("timestamp", timestamp));

        let query_string = serde_urlencoded::to_string(&params)
            .map_err(|e| BotError::Configuration(format!("cannot encode query: {e}")))?;

        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|_| BotError::Configuration("Invalid secret key length".to_string()))?;
        mac.update(query_string.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{}&signature={}", query_string, signature))
    }

    async fn send_public_request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_rest_url, endpoint);
        let response = self.http_client.get(&url).query(&params).send().await?;
        decode(response).await
    }

    async fn send_signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> Result<T> {
        let full_query = self.sign_and_build_query(params)?;
        let url = format!("{}{}?{}", self.base_rest_url, endpoint, full_query);

        let response = self
            .http_client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;
        decode(response).await
    }

    async fn place_market_order(&self, symbol: &str, side: &str, quantity: Decimal) -> Result<Fill> {
        let client_order_id = Uuid::new_v4().simple().to_string();
        let params = vec![
            ("symbol", symbol.to_string()),
            ("side", side.to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", quantity.normalize().to_string()),
            ("newOrderRespType", "FULL".to_string()),
            ("newClientOrderId", client_order_id.clone()),
        ];

        info!(
            symbol,
            side,
            %quantity,
            client_order_id = %client_order_id,
            "Sending market order"
        );

        let order: OrderFull = self
            .send_signed_request(Method::POST, "/api/v3/order", params)
            .await?;
        debug!(order_id = order.order_id, status = %order.status, "Order acknowledged");

        fill_from_order(symbol, &order)
    }
}

/// Maps a response to `T`, turning HTTP failures into the error taxonomy.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &body))
}

fn classify_failure(status: StatusCode, body: &str) -> BotError {
    if status == StatusCode::TOO_MANY_REQUESTS
        || status.as_u16() == 418
        || status.is_server_error()
    {
        return BotError::TransientNetwork(format!("HTTP {status}: {body}"));
    }
    match serde_json::from_str::<ApiError>(body) {
        Ok(api) => BotError::ExchangeRejection {
            code: Some(api.code),
            reason: api.msg,
        },
        Err(_) => BotError::ExchangeRejection {
            code: None,
            reason: format!("HTTP {status}: {body}"),
        },
    }
}

fn parse_decimal(raw: &str, field: &str) -> Result<Decimal> {
    Decimal::from_str(raw).map_err(|e| BotError::TransientNetwork(format!("bad {field} '{raw}': {e}")))
}

/// Commission charged in the symbol's base asset. It never reaches the
/// account, so it is not part of what can be sold later.
fn base_commission(symbol: &str, order: &OrderFull) -> Result<Decimal> {
    let mut total = Decimal::ZERO;
    for fill in &order.fills {
        let asset = fill.commission_asset.as_str();
        if asset.is_empty() || fill.commission.is_empty() || asset.len() >= symbol.len() {
            continue;
        }
        if symbol.starts_with(asset) {
            total += parse_decimal(&fill.commission, "commission")?;
        }
    }
    Ok(total)
}

fn fill_from_order(symbol: &str, order: &OrderFull) -> Result<Fill> {
    let executed_qty = parse_decimal(&order.executed_qty, "executedQty")?;
    let quote_qty = parse_decimal(&order.cummulative_quote_qty, "cummulativeQuoteQty")?;
    let commission = base_commission(symbol, order)?;
    let filled_qty = (executed_qty - commission).max(Decimal::ZERO);
    if !commission.is_zero() {
        debug!(symbol, %executed_qty, %commission, "Base asset commission deducted");
    }

    let avg_price = if !executed_qty.is_zero() && !quote_qty.is_zero() {
        quote_qty / executed_qty
    } else if let Some(first) = order.fills.first() {
        parse_decimal(&first.price, "fill price")?
    } else {
        Decimal::ZERO
    };

    Ok(Fill {
        filled_qty,
        avg_price,
    })
}

#[async_trait]
impl MarketDataClient for BinanceClient {
    async fn get_ticker(&self, symbol: &str) -> Result<TickerSnapshot> {
        let ticker: Ticker24hr = self
            .send_public_request("/api/v3/ticker/24hr", vec![("symbol", symbol.to_string())])
            .await?;

        Ok(TickerSnapshot {
            symbol: ticker.symbol,
            last_price: parse_decimal(&ticker.last_price, "lastPrice")?,
            percent_change_24h: parse_decimal(&ticker.price_change_percent, "priceChangePercent")?,
        })
    }

    async fn get_symbol_filters(&self, symbol: &str) -> Result<SymbolFilters> {
        let info: ExchangeInfo = self
            .send_public_request("/api/v3/exchangeInfo", vec![("symbol", symbol.to_string())])
            .await?;

        let symbol_info = info
            .symbols
            .into_iter()
            .find(|s| s.symbol == symbol)
            .ok_or_else(|| BotError::Configuration(format!("{symbol} missing from exchangeInfo")))?;

        let mut lot = None;
        let mut tick = None;
        for filter in symbol_info.filters {
            match filter {
                SymbolFilter::LotSize { min_qty, step_size } => lot = Some((min_qty, step_size)),
                SymbolFilter::PriceFilter { tick_size } => tick = Some(tick_size),
                SymbolFilter::Other => {}
            }
        }

        let (min_qty, step_size) =
            lot.ok_or_else(|| BotError::Configuration(format!("{symbol} has no LOT_SIZE filter")))?;
        let tick_size = tick
            .ok_or_else(|| BotError::Configuration(format!("{symbol} has no PRICE_FILTER filter")))?;

        Ok(SymbolFilters {
            symbol: symbol.to_string(),
            min_qty,
            step_size,
            tick_size,
        })
    }
}

#[async_trait]
impl AccountClient for BinanceClient {
    async fn get_free_balance(&self, asset: &str) -> Result<Decimal> {
        let resp: AccountInfo = self
            .send_signed_request(Method::GET, "/api/v3/account", vec![])
            .await?;

        // Binance omits zero balances for some account types.
        match resp.balances.iter().find(|b| b.asset == asset) {
            Some(balance) => parse_decimal(&balance.free, "free"),
            None => Ok(Decimal::ZERO),
        }
    }
}

#[async_trait]
impl ExecutionClient for BinanceClient {
    async fn place_market_buy(&self, symbol: &str, quantity: Decimal) -> Result<Fill> {
        self.place_market_order(symbol, "BUY", quantity).await
    }

    async fn place_market_sell(&self, symbol: &str, quantity: Decimal) -> Result<Fill> {
        self.place_market_order(symbol, "SELL", quantity).await
    }
}
