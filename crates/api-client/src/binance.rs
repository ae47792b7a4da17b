use crate::MarketDataSource;
use crate::error::ApiError;
use crate::responses::{BinanceErrorResponse, BinanceRawKline, BinanceTickerPrice, decimal};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use configuration::Venue;
use core_types::Kline;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

const BASE_URL: &str = "https://api.binance.com";

/// Public spot market data from Binance, quoted in USDT.
#[derive(Clone)]
pub struct BinanceSource {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn native_symbol(base: &str) -> String {
        format!("{}USDT", base.to_uppercase())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str::<T>(&text).map_err(|e| ApiError::Deserialization(e.to_string()))
        } else {
            let api_error: BinanceErrorResponse = serde_json::from_str(&text).map_err(|e| {
                ApiError::Deserialization(format!(
                    "Failed to deserialize error response: {}. Original text: {}",
                    e, text
                ))
            })?;
            Err(ApiError::ApiError(format!("binance {}: {}", api_error.code, api_error.msg)))
        }
    }
}

/// Converts raw Binance kline rows into `Kline`s.
pub fn parse_klines(rows: Vec<BinanceRawKline>, interval: &str) -> Result<Vec<Kline>, ApiError> {
    rows.into_iter()
        .map(|raw| {
            Ok(Kline {
                open_time: Utc
                    .timestamp_millis_opt(raw.0)
                    .single()
                    .ok_or_else(|| ApiError::InvalidData(format!("Invalid open_time: {}", raw.0)))?,
                open: decimal("open", &raw.1)?,
                high: decimal("high", &raw.2)?,
                low: decimal("low", &raw.3)?,
                close: decimal("close", &raw.4)?,
                volume: decimal("volume", &raw.5)?,
                close_time: Utc
                    .timestamp_millis_opt(raw.6)
                    .single()
                    .ok_or_else(|| ApiError::InvalidData(format!("Invalid close_time: {}", raw.6)))?,
                interval: interval.to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl MarketDataSource for BinanceSource {
    fn venue(&self) -> &str {
        Venue::Binance.id()
    }

    fn pair_for(&self, base: &str) -> String {
        format!("{}/USDT", base.to_uppercase())
    }

    async fn fetch_klines(&self, base: &str, interval: &str, limit: usize) -> Result<Vec<Kline>, ApiError> {
        let rows: Vec<BinanceRawKline> = self
            .get(
                "/api/v3/klines",
                &[
                    ("symbol", Self::native_symbol(base)),
                    ("interval", interval.to_string()),
                    // Binance caps a single request at 1000 bars.
                    ("limit", limit.min(1000).to_string()),
                ],
            )
            .await?;
        parse_klines(rows, interval)
    }

    async fn fetch_last_price(&self, base: &str) -> Result<Decimal, ApiError> {
        let ticker: BinanceTickerPrice = self
            .get("/api/v3/ticker/price", &[("symbol", Self::native_symbol(base))])
            .await?;
        decimal("price", &ticker.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_kline_rows() {
        let payload = r#"[
            [1499040000000, "0.01634790", "0.80000000", "0.01575800", "0.01577100", "148976.11427815",
             1499644799999, "2434.19055334", 308, "1756.87402397", "28.46694368", "0"]
        ]"#;
        let rows: Vec<BinanceRawKline> = serde_json::from_str(payload).unwrap();
        let klines = parse_klines(rows, "4h").unwrap();

        assert_eq!(klines.len(), 1);
        assert_eq!(klines[0].open, dec!(0.01634790));
        assert_eq!(klines[0].close, dec!(0.01577100));
        assert_eq!(klines[0].open_time.timestamp_millis(), 1499040000000);
        assert_eq!(klines[0].interval, "4h");
    }

    #[test]
    fn resolves_usdt_pairs() {
        let source = BinanceSource::new(reqwest::Client::new());
        assert_eq!(source.pair_for("btc"), "BTC/USDT");
        assert_eq!(BinanceSource::native_symbol("eth"), "ETHUSDT");
    }
}
