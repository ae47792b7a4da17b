//! Touch and proximity checks against a long simple moving average.

use crate::error::StrategyError;
use core_types::Kline;
use rust_decimal::prelude::*;
use ta::Next as _;
use ta::indicators::SimpleMovingAverage as Sma;

/// Where the latest bar sits relative to the moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmaReading {
    /// Not enough bars for a full-period average.
    Undefined,
    /// The latest bar's range contains the average (`low <= sma <= high`).
    Touch { sma: Decimal, close: Decimal },
    /// The latest close is within the proximity threshold of the average.
    Near { sma: Decimal, close: Decimal, distance: Decimal },
    /// Neither touching nor close.
    Away { sma: Decimal, close: Decimal },
}

/// Assesses the most recent bar against the `period`-bar SMA of closes.
///
/// A touch wins over proximity. `proximity_pct` is a fraction (0.02 = 2%).
pub fn assess_sma(
    klines: &[Kline],
    period: usize,
    proximity_pct: Decimal,
) -> Result<SmaReading, StrategyError> {
    let Some(last) = klines.last() else {
        return Ok(SmaReading::Undefined);
    };
    if klines.len() < period {
        return Ok(SmaReading::Undefined);
    }

    let mut sma = Sma::new(period)
        .map_err(|e| StrategyError::InvalidParameters(format!("Failed to initialize SMA: {:?}", e)))?;

    let mut latest = 0.0;
    for kline in klines {
        let close = kline.close.to_f64().ok_or_else(|| {
            StrategyError::InvalidParameters(format!("Failed to convert close {} to f64", kline.close))
        })?;
        latest = sma.next(close);
    }

    let sma = Decimal::from_f64(latest)
        .ok_or_else(|| StrategyError::IndicatorError(format!("SMA value {latest} is not finite")))?;
    if sma <= Decimal::ZERO {
        return Err(StrategyError::IndicatorError(format!(
            "SMA value {sma} is not positive"
        )));
    }

    let close = last.close;
    if last.low <= sma && sma <= last.high {
        return Ok(SmaReading::Touch { sma, close });
    }

    let distance = (close - sma).abs() / sma;
    if distance <= proximity_pct {
        Ok(SmaReading::Near { sma, close, distance })
    } else {
        Ok(SmaReading::Away { sma, close })
    }
}
