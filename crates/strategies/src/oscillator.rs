//! Relative Strength Index with Wilder smoothing.
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! The first `period` entries have no value. avg_loss == 0 gives 100,
//! avg_gain == 0 gives 0, and a perfectly flat window gives 50.

use crate::error::StrategyError;

/// Computes the oscillator over `closes`, aligned index-for-index with the input.
///
/// Fails with `InsufficientData` when `closes.len() <= period`.
pub fn relative_strength(closes: &[f64], period: usize) -> Result<Vec<Option<f64>>, StrategyError> {
    if period == 0 {
        return Err(StrategyError::InvalidParameters(
            "RSI period cannot be zero".to_string(),
        ));
    }
    let n = closes.len();
    if n <= period {
        return Err(StrategyError::InsufficientData {
            required: period,
            available: n,
        });
    }

    let mut result = vec![None; n];

    // Seed: simple averages over the first `period` changes.
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    result[period] = Some(rsi_value(avg_gain, avg_loss));

    let weight = (period - 1) as f64;
    for i in (period + 1)..n {
        let change = closes[i] - closes[i - 1];
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };

        avg_gain = (avg_gain * weight + gain) / period as f64;
        avg_loss = (avg_loss * weight + loss) / period as f64;

        result[i] = Some(rsi_value(avg_gain, avg_loss));
    }

    Ok(result)
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
