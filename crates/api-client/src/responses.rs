use crate::error::ApiError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

// Raw payload shapes for the public endpoints. Numeric fields arrive as strings.

/// One row of `GET /api/v3/klines` on Binance.
#[derive(Debug, Deserialize)]
pub struct BinanceRawKline(
    pub i64,
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
    pub i64,
    pub String,
    pub i64,
    pub String,
    pub String,
    pub String,
);

/// `GET /api/v3/ticker/price` on Binance.
#[derive(Debug, Deserialize)]
pub struct BinanceTickerPrice {
    pub symbol: String,
    pub price: String,
}

/// Represents an error response from the Binance API.
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceErrorResponse {
    pub code: i64,
    pub msg: String,
}

/// The envelope every Kraken public endpoint returns.
#[derive(Debug, Deserialize)]
pub struct KrakenEnvelope<T> {
    #[serde(default)]
    pub error: Vec<String>,
    pub result: Option<T>,
}

/// One row of Kraken's `OHLC`: time, open, high, low, close, vwap, volume, count.
#[derive(Debug, Deserialize)]
pub struct KrakenRawOhlc(
    pub i64,
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
    pub i64,
);

/// Kraken's `Ticker` entry. `c` is `[last trade price, lot volume]`.
#[derive(Debug, Deserialize)]
pub struct KrakenTicker {
    pub c: Vec<String>,
}

pub type KrakenTickerResult = HashMap<String, KrakenTicker>;

/// Gate.io `GET /spot/tickers` entry.
#[derive(Debug, Deserialize)]
pub struct GateioTicker {
    pub currency_pair: String,
    pub last: String,
}

/// Gate.io error body.
#[derive(Debug, Deserialize)]
pub struct GateioErrorResponse {
    pub label: String,
    #[serde(default)]
    pub message: String,
}

/// CoinGecko `/coins/markets` entry. Only the ticker symbol is needed.
#[derive(Debug, Deserialize)]
pub struct CoinMarket {
    pub symbol: String,
}

/// Parses one of the many string-encoded decimals in these payloads.
pub(crate) fn decimal(field: &str, raw: &str) -> Result<Decimal, ApiError> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| ApiError::Deserialization(format!("{field} '{raw}': {e}")))
}
