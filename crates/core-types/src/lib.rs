//! # Sentinel Core Types
//!
//! The foundational, dependency-free vocabulary shared by every other crate in the
//! workspace: market bars, trade direction, pivots, signals and the simulated
//! `Position` record that lives in the ledger.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{PivotKind, PositionSide, Target};
pub use error::CoreError;
pub use structs::{Kline, Pivot, Position, PositionLevels, Signal};
