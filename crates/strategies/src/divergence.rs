use crate::Strategy;
use crate::error::StrategyError;
use crate::oscillator::relative_strength;
use crate::pivots::find_pivots;
use configuration::ScannerConfig;
use core_types::{Kline, PivotKind, PositionSide, Signal};
use rust_decimal::prelude::*;

/// Parameters for the triple-pivot divergence classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivergenceParams {
    pub rsi_period: usize,
    pub pivot_order: usize,
    /// Bars that must remain once the oscillator warm-up has been trimmed.
    pub min_aligned_bars: usize,
}

impl Default for DivergenceParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            pivot_order: 4,
            min_aligned_bars: 50,
        }
    }
}

impl From<&ScannerConfig> for DivergenceParams {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            rsi_period: config.rsi_period,
            pivot_order: config.pivot_order,
            min_aligned_bars: config.min_aligned_bars,
        }
    }
}

/// Classifies a close series.
///
/// The oscillator's undefined warm-up prefix is dropped from both series so they
/// stay index-aligned. Series that are too short produce no signal.
pub fn classify(closes: &[f64], params: &DivergenceParams) -> Option<PositionSide> {
    let oscillator = match relative_strength(closes, params.rsi_period) {
        Ok(values) => values,
        Err(e) => {
            tracing::debug!(error = %e, "Not enough closes for the oscillator");
            return None;
        }
    };

    let first_defined = oscillator.iter().position(Option::is_some)?;
    let prices = &closes[first_defined..];
    let momentum: Vec<f64> = oscillator[first_defined..].iter().flatten().copied().collect();

    if prices.len() < params.min_aligned_bars {
        tracing::debug!(
            aligned = prices.len(),
            required = params.min_aligned_bars,
            "Too few aligned bars for divergence"
        );
        return None;
    }

    divergence_at(prices, &momentum, params.pivot_order)
}

/// The pattern test on already-aligned price and oscillator sequences.
///
/// Looks at the three most recent low pivots first: strictly falling prices with
/// strictly rising oscillator values is a Long. Only if that does not fire are
/// the three most recent high pivots checked: strictly rising prices with
/// strictly falling oscillator values is a Short.
///
/// The two sequences must be the same length; mismatched input yields `None`.
pub fn divergence_at(prices: &[f64], oscillator: &[f64], order: usize) -> Option<PositionSide> {
    if prices.len() != oscillator.len() {
        return None;
    }

    let lows = find_pivots(prices, order, PivotKind::Low);
    if let Some([a, b, c]) = last_three(&lows) {
        let price_falling = prices[a] > prices[b] && prices[b] > prices[c];
        let momentum_rising = oscillator[a] < oscillator[b] && oscillator[b] < oscillator[c];
        if price_falling && momentum_rising {
            return Some(PositionSide::Long);
        }
    }

    let highs = find_pivots(prices, order, PivotKind::High);
    if let Some([a, b, c]) = last_three(&highs) {
        let price_rising = prices[a] < prices[b] && prices[b] < prices[c];
        let momentum_falling = oscillator[a] > oscillator[b] && oscillator[b] > oscillator[c];
        if price_rising && momentum_falling {
            return Some(PositionSide::Short);
        }
    }

    None
}

fn last_three(indices: &[usize]) -> Option<[usize; 3]> {
    match indices {
        [.., a, b, c] => Some([*a, *b, *c]),
        _ => None,
    }
}

/// The price/momentum divergence strategy used by the scanner.
#[derive(Debug, Clone)]
pub struct DivergenceStrategy {
    params: DivergenceParams,
}

impl DivergenceStrategy {
    /// Creates a new `DivergenceStrategy`, validating its parameters.
    pub fn new(params: DivergenceParams) -> Result<Self, StrategyError> {
        if params.rsi_period == 0 {
            return Err(StrategyError::InvalidParameters(
                "RSI period cannot be zero".to_string(),
            ));
        }
        if params.pivot_order == 0 {
            return Err(StrategyError::InvalidParameters(
                "Pivot order cannot be zero".to_string(),
            ));
        }
        Ok(Self { params })
    }
}

impl Strategy for DivergenceStrategy {
    fn evaluate(&self, symbol: &str, klines: &[Kline]) -> Result<Option<Signal>, StrategyError> {
        let Some(last) = klines.last() else {
            return Ok(None);
        };

        // The oscillator works in `f64`. This is an accepted precision trade-off.
        let closes = klines
            .iter()
            .map(|k| {
                k.close.to_f64().ok_or_else(|| {
                    StrategyError::InvalidParameters(format!(
                        "Failed to convert close {} to f64",
                        k.close
                    ))
                })
            })
            .collect::<Result<Vec<f64>, StrategyError>>()?;

        let signal = classify(&closes, &self.params)
            .map(|side| Signal::new(symbol, side, last.close_time));

        if let Some(s) = &signal {
            tracing::debug!(symbol, side = %s.side, "Divergence detected");
        }
        Ok(signal)
    }
}
