//! # Sentinel Ledger
//!
//! The persistent account record: balance, win/loss tallies and the open
//! simulated positions keyed by trading pair. The whole ledger is loaded once
//! per run, mutated in memory by the engine and written back atomically.

pub mod error;
pub mod store;

pub use error::LedgerError;
pub use store::LedgerStore;

use core_types::Position;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The schema version written by this build. Files without a `version` field
/// are schema 0, which differs only in lacking the `tp1_hit`/`tp2_hit` flags.
pub const LEDGER_VERSION: u32 = 1;

/// Account state carried between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub version: u32,
    pub balance: Decimal,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    /// Open positions keyed by pair (e.g. `BTC/USDT`). Ordered so the file and
    /// the evaluation order are deterministic.
    #[serde(default)]
    pub positions: BTreeMap<String, Position>,
}

impl Ledger {
    /// A fresh ledger with no history.
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            version: LEDGER_VERSION,
            balance: initial_balance,
            wins: 0,
            losses: 0,
            positions: BTreeMap::new(),
        }
    }

    pub fn open_positions(&self) -> usize {
        self.positions.len()
    }

    pub fn holds(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    /// Records a newly opened position. Opening moves no cash.
    pub fn record_open(&mut self, symbol: impl Into<String>, position: Position) -> Result<(), LedgerError> {
        let symbol = symbol.into();
        if self.positions.contains_key(&symbol) {
            return Err(LedgerError::AlreadyOpen(symbol));
        }
        self.positions.insert(symbol, position);
        Ok(())
    }

    /// Drops positions whose levels no longer satisfy the ordering invariant.
    /// Returns the symbols removed.
    pub fn discard_invalid(&mut self) -> Vec<String> {
        let invalid: Vec<String> = self
            .positions
            .iter()
            .filter_map(|(symbol, position)| match position.validate() {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!(%symbol, error = %e, "Discarding invalid position from ledger.");
                    Some(symbol.clone())
                }
            })
            .collect();
        for symbol in &invalid {
            self.positions.remove(symbol);
        }
        invalid
    }
}
