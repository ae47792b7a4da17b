//! # Sentinel Engine
//!
//! Orchestrates one invocation: re-price open positions, scan for new
//! divergence entries while the account has capacity, run the optional SMA
//! watch, then persist the ledger.

pub mod error;
pub mod evaluator;
pub mod runner;
pub mod watch;

pub use error::EngineError;
pub use evaluator::evaluate;
pub use runner::{Engine, RunReport};
pub use watch::{WatchReport, watch_sma};
