//! # Sentinel Strategy Library
//!
//! The pattern-detection side of the system. Everything here is pure: series in,
//! classification out. No I/O, no ledger, no clocks.
//!
//! ## Public API
//!
//! - `relative_strength`: the Wilder-smoothed momentum oscillator.
//! - `find_pivots` / `pivots`: strict symmetric-window local extrema.
//! - `classify` / `divergence_at`: the triple-pivot divergence classifier.
//! - `DivergenceStrategy`: wraps the classifier behind the `Strategy` trait.
//! - `sma_watch`: touch/proximity checks against a long simple moving average.

// Declare all the modules that constitute this crate.
pub mod divergence;
pub mod error;
pub mod oscillator;
pub mod pivots;
pub mod sma_watch;

// Re-export the key components to create a clean, public-facing API.
pub use divergence::{DivergenceParams, DivergenceStrategy, classify, divergence_at};
pub use error::StrategyError;
pub use oscillator::relative_strength;
pub use pivots::{find_pivots, pivots};
pub use sma_watch::{SmaReading, assess_sma};

use core_types::{Kline, Signal};

/// The interface the run orchestrator uses to scan a symbol.
///
/// A strategy looks at one complete bar snapshot at a time. It keeps no state
/// between calls, so the same snapshot always produces the same answer.
pub trait Strategy: Send + Sync {
    /// Evaluates the strategy on a full bar sequence, oldest first.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Signal))` - if the pattern fired on this snapshot.
    /// * `Ok(None)` - if it did not, including when the series is too short.
    /// * `Err(StrategyError)` - if the input could not be converted for analysis.
    fn evaluate(&self, symbol: &str, klines: &[Kline]) -> Result<Option<Signal>, StrategyError>;
}
