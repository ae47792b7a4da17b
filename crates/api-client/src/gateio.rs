use crate::MarketDataSource;
use crate::error::ApiError;
use crate::interval::interval_duration;
use crate::responses::{GateioErrorResponse, GateioTicker, decimal};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use configuration::Venue;
use core_types::Kline;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

const BASE_URL: &str = "https://api.gateio.ws/api/v4";

/// Public spot market data from Gate.io, quoted in USDT.
#[derive(Clone)]
pub struct GateioSource {
    client: reqwest::Client,
    base_url: String,
}

impl GateioSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn native_pair(base: &str) -> String {
        format!("{}_USDT", base.to_uppercase())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str::<T>(&text).map_err(|e| ApiError::Deserialization(e.to_string()))
        } else {
            let message = serde_json::from_str::<GateioErrorResponse>(&text)
                .map(|e| format!("{} {}", e.label, e.message))
                .unwrap_or(text);
            Err(ApiError::ApiError(format!("gateio {}: {}", status.as_u16(), message)))
        }
    }
}

/// Gate.io names the weekly interval `7d` and has no 3-day bars.
fn native_interval(interval: &str) -> Result<&str, ApiError> {
    match interval {
        "1m" | "5m" | "15m" | "30m" | "1h" | "4h" | "8h" | "1d" | "30d" => Ok(interval),
        "1w" | "7d" => Ok("7d"),
        other => Err(ApiError::InvalidData(format!(
            "gateio does not serve the '{other}' interval"
        ))),
    }
}

/// Converts Gate.io candlestick rows.
///
/// Each row is `[unix seconds, quote volume, close, high, low, open, base volume, closed]`,
/// all string-encoded. Rows are sorted oldest first before returning.
pub fn parse_candles(rows: Vec<Vec<String>>, interval: &str) -> Result<Vec<Kline>, ApiError> {
    let step = interval_duration(interval)
        .ok_or_else(|| ApiError::InvalidData(format!("Unrecognised interval '{interval}'")))?;

    let mut klines = rows
        .into_iter()
        .map(|row| {
            if row.len() < 7 {
                return Err(ApiError::InvalidData(format!(
                    "gateio candle has {} fields, expected at least 7",
                    row.len()
                )));
            }
            let seconds: i64 = row[0]
                .parse()
                .map_err(|e| ApiError::Deserialization(format!("timestamp '{}': {}", row[0], e)))?;
            let open_time = Utc
                .timestamp_opt(seconds, 0)
                .single()
                .ok_or_else(|| ApiError::InvalidData(format!("Invalid open_time: {seconds}")))?;
            Ok(Kline {
                open_time,
                open: decimal("open", &row[5])?,
                high: decimal("high", &row[3])?,
                low: decimal("low", &row[4])?,
                close: decimal("close", &row[2])?,
                volume: decimal("volume", &row[6])?,
                close_time: open_time + step,
                interval: interval.to_string(),
            })
        })
        .collect::<Result<Vec<Kline>, ApiError>>()?;

    klines.sort_by_key(|k| k.open_time);
    Ok(klines)
}

#[async_trait]
impl MarketDataSource for GateioSource {
    fn venue(&self) -> &str {
        Venue::Gateio.id()
    }

    fn pair_for(&self, base: &str) -> String {
        format!("{}/USDT", base.to_uppercase())
    }

    async fn fetch_klines(&self, base: &str, interval: &str, limit: usize) -> Result<Vec<Kline>, ApiError> {
        let rows: Vec<Vec<String>> = self
            .get(
                "/spot/candlesticks",
                &[
                    ("currency_pair", Self::native_pair(base)),
                    ("interval", native_interval(interval)?.to_string()),
                    ("limit", limit.min(1000).to_string()),
                ],
            )
            .await?;
        parse_candles(rows, interval)
    }

    async fn fetch_last_price(&self, base: &str) -> Result<Decimal, ApiError> {
        let tickers: Vec<GateioTicker> = self
            .get("/spot/tickers", &[("currency_pair", Self::native_pair(base))])
            .await?;
        let ticker = tickers
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::InvalidData("gateio returned no ticker".to_string()))?;
        decimal("last", &ticker.last)
    }
}
