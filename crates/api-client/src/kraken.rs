use crate::MarketDataSource;
use crate::error::ApiError;
use crate::interval::interval_duration;
use crate::responses::{KrakenEnvelope, KrakenRawOhlc, KrakenTickerResult, decimal};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use configuration::Venue;
use core_types::Kline;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

const BASE_URL: &str = "https://api.kraken.com";

/// Public spot market data from Kraken, quoted in USD.
#[derive(Clone)]
pub struct KrakenSource {
    client: reqwest::Client,
    base_url: String,
}

impl KrakenSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Kraken keeps a few legacy asset codes.
    fn native_pair(base: &str) -> String {
        let base = base.to_uppercase();
        let asset = match base.as_str() {
            "BTC" => "XBT",
            "DOGE" => "XDG",
            other => other,
        };
        format!("{asset}USD")
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let envelope: KrakenEnvelope<T> = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope<T>(envelope: KrakenEnvelope<T>) -> Result<T, ApiError> {
    if !envelope.error.is_empty() {
        return Err(ApiError::ApiError(format!("kraken: {}", envelope.error.join(", "))));
    }
    envelope
        .result
        .ok_or_else(|| ApiError::InvalidData("kraken response has no result".to_string()))
}

/// Kraken expresses OHLC intervals in minutes and supports a fixed set.
fn interval_minutes(interval: &str) -> Result<i64, ApiError> {
    let minutes = interval_duration(interval)
        .map(|d| d.num_minutes())
        .ok_or_else(|| ApiError::InvalidData(format!("Unrecognised interval '{interval}'")))?;
    match minutes {
        1 | 5 | 15 | 30 | 60 | 240 | 1440 | 10080 | 21600 => Ok(minutes),
        _ => Err(ApiError::InvalidData(format!(
            "kraken does not serve the '{interval}' interval"
        ))),
    }
}

/// Extracts and converts the OHLC rows from a Kraken `result` object.
///
/// The object holds one entry keyed by Kraken's own pair name plus a `last`
/// cursor, so the rows are found by skipping `last`.
pub fn parse_ohlc(
    mut result: HashMap<String, serde_json::Value>,
    interval: &str,
    limit: usize,
) -> Result<Vec<Kline>, ApiError> {
    result.remove("last");
    let rows = result
        .into_values()
        .next()
        .ok_or_else(|| ApiError::InvalidData("kraken OHLC result is empty".to_string()))?;
    let rows: Vec<KrakenRawOhlc> =
        serde_json::from_value(rows).map_err(|e| ApiError::Deserialization(e.to_string()))?;

    let step = interval_duration(interval)
        .ok_or_else(|| ApiError::InvalidData(format!("Unrecognised interval '{interval}'")))?;

    let skip = rows.len().saturating_sub(limit);
    rows.into_iter()
        .skip(skip)
        .map(|raw| {
            let open_time = Utc
                .timestamp_opt(raw.0, 0)
                .single()
                .ok_or_else(|| ApiError::InvalidData(format!("Invalid open_time: {}", raw.0)))?;
            Ok(Kline {
                open_time,
                open: decimal("open", &raw.1)?,
                high: decimal("high", &raw.2)?,
                low: decimal("low", &raw.3)?,
                close: decimal("close", &raw.4)?,
                volume: decimal("volume", &raw.6)?,
                close_time: open_time + step,
                interval: interval.to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl MarketDataSource for KrakenSource {
    fn venue(&self) -> &str {
        Venue::Kraken.id()
    }

    fn pair_for(&self, base: &str) -> String {
        format!("{}/USD", base.to_uppercase())
    }

    async fn fetch_klines(&self, base: &str, interval: &str, limit: usize) -> Result<Vec<Kline>, ApiError> {
        let minutes = interval_minutes(interval)?;
        let result: HashMap<String, serde_json::Value> = self
            .get(
                "/0/public/OHLC",
                &[("pair", Self::native_pair(base)), ("interval", minutes.to_string())],
            )
            .await?;
        parse_ohlc(result, interval, limit)
    }

    async fn fetch_last_price(&self, base: &str) -> Result<Decimal, ApiError> {
        let result: KrakenTickerResult = self
            .get("/0/public/Ticker", &[("pair", Self::native_pair(base))])
            .await?;
        let ticker = result
            .into_values()
            .next()
            .ok_or_else(|| ApiError::InvalidData("kraken ticker result is empty".to_string()))?;
        let last = ticker
            .c
            .first()
            .ok_or_else(|| ApiError::InvalidData("kraken ticker has no last trade".to_string()))?;
        decimal("last", last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn maps_legacy_asset_codes() {
        assert_eq!(KrakenSource::native_pair("btc"), "XBTUSD");
        assert_eq!(KrakenSource::native_pair("DOGE"), "XDGUSD");
        assert_eq!(KrakenSource::native_pair("SOL"), "SOLUSD");
    }

    #[test]
    fn only_supported_intervals_are_requested() {
        assert_eq!(interval_minutes("4h").unwrap(), 240);
        assert_eq!(interval_minutes("1w").unwrap(), 10080);
        assert!(interval_minutes("3d").is_err());
    }

    #[test]
    fn parses_ohlc_and_keeps_the_most_recent_rows() {
        let payload = r#"{
            "error": [],
            "result": {
                "XXBTZUSD": [
                    [1688671200, "30306.1", "30306.2", "30305.7", "30305.7", "30306.1", "3.39243896", 23],
                    [1688685600, "30305.7", "30310.0", "30300.0", "30309.9", "30305.0", "1.50000000", 12],
                    [1688700000, "30309.9", "30400.0", "30290.0", "30350.5", "30340.0", "2.25000000", 40]
                ],
                "last": 1688700000
            }
        }"#;
        let envelope: KrakenEnvelope<HashMap<String, serde_json::Value>> =
            serde_json::from_str(payload).unwrap();
        let klines = parse_ohlc(unwrap_envelope(envelope).unwrap(), "4h", 2).unwrap();

        assert_eq!(klines.len(), 2);
        assert_eq!(klines[0].close, dec!(30309.9));
        assert_eq!(klines[1].close, dec!(30350.5));
        assert_eq!(klines[1].volume, dec!(2.25));
        assert_eq!(klines[1].close_time - klines[1].open_time, chrono::Duration::hours(4));
    }

    #[test]
    fn api_errors_in_the_envelope_are_reported() {
        let payload = r#"{"error": ["EQuery:Unknown asset pair"]}"#;
        let envelope: KrakenEnvelope<KrakenTickerResult> = serde_json::from_str(payload).unwrap();
        assert!(matches!(unwrap_envelope(envelope), Err(ApiError::ApiError(_))));
    }
}
