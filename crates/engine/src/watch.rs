//! The long-SMA watch: touch alerts and the periodic proximity summary.
//!
//! Read-only with respect to the ledger.

use alerter::{Notifier, notify_best_effort};
use api_client::SeriesSampler;
use chrono::{DateTime, Timelike, Utc};
use configuration::SmaWatchConfig;
use events::{ProximitySummary, SmaTouch};
use strategies::{SmaReading, assess_sma};

/// What one pass of the watch found and sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchReport {
    pub touches: usize,
    pub near: usize,
    pub summary_sent: bool,
}

/// Checks every coin on every configured timeframe.
///
/// Touches are alerted as they are found. The proximity summary goes out only
/// if `now` falls in the first `summary_window_minutes` of the hour and at
/// least one coin is near its average.
pub async fn watch_sma(
    sampler: &SeriesSampler,
    notifier: &dyn Notifier,
    config: &SmaWatchConfig,
    coins: &[String],
    now: DateTime<Utc>,
) -> WatchReport {
    let mut report = WatchReport::default();
    let mut summary = ProximitySummary::new(
        config.period,
        config.proximity_pct,
        config.timeframes.iter().map(|t| t.label.clone()),
    );

    for coin in coins {
        for timeframe in &config.timeframes {
            let series = match sampler
                .fetch(coin, &timeframe.interval, config.candle_limit, config.period)
                .await
            {
                Ok(series) => series,
                Err(e) => {
                    tracing::debug!(coin = %coin, timeframe = %timeframe.label, error = %e, "Skipping SMA check");
                    continue;
                }
            };

            match assess_sma(&series.klines, config.period, config.proximity_pct) {
                Ok(SmaReading::Touch { sma, close }) => {
                    tracing::info!(coin = %coin, timeframe = %timeframe.label, %sma, %close, venue = %series.venue, "SMA touch");
                    let touch = SmaTouch {
                        coin: coin.clone(),
                        timeframe: timeframe.label.clone(),
                        period: config.period,
                        price: close,
                    };
                    notify_best_effort(notifier, &touch.message()).await;
                    report.touches += 1;
                }
                Ok(SmaReading::Near { close, distance, .. }) => {
                    tracing::debug!(coin = %coin, timeframe = %timeframe.label, %distance, "Close near SMA");
                    summary.add(&timeframe.label, coin.clone(), close);
                    report.near += 1;
                }
                Ok(SmaReading::Away { .. } | SmaReading::Undefined) => {}
                Err(e) => {
                    tracing::warn!(coin = %coin, timeframe = %timeframe.label, error = %e, "SMA assessment failed");
                }
            }
        }
    }

    if now.minute() < config.summary_window_minutes
        && let Some(message) = summary.message()
    {
        notify_best_effort(notifier, &message).await;
        report.summary_sent = true;
    }

    report
}
