//! # Sentinel Risk
//!
//! Position sizing rules for the simulated account: where a new position's stop
//! and targets sit, what each target pays, what a stop-out costs, and whether
//! the account has room for another position.

pub mod error;
pub mod gate;
pub mod simple_manager;

pub use error::RiskError;
pub use gate::OpeningGate;
pub use simple_manager::SimpleRiskManager;

use core_types::{PositionLevels, PositionSide, Target};
use rust_decimal::Decimal;

/// The pricing rules the evaluator and the scanner apply to positions.
pub trait RiskManager: Send + Sync {
    /// Computes the stop-loss and take-profit prices for a position entered at `entry`.
    fn levels_for(&self, side: PositionSide, entry: Decimal) -> Result<PositionLevels, RiskError>;

    /// The balance credited when `target` is reached.
    fn target_profit(&self, target: Target) -> Decimal;

    /// The balance debited when a position is stopped out before TP1.
    fn stop_loss_amount(&self) -> Decimal;
}
