use crate::enums::{PivotKind, PositionSide};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single OHLCV bar for one sampling interval. Sequences are ordered oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub close_time: DateTime<Utc>,
    pub interval: String,
}

/// A local extremum found in a close-price sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pivot {
    pub index: usize,
    pub value: f64,
    pub kind: PivotKind,
}

/// A directional trade signal produced by a strategy for one series snapshot.
///
/// Signals are never persisted. They are consumed immediately to open a `Position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub signal_id: Uuid,
    pub symbol: String,
    pub side: PositionSide,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn new(symbol: impl Into<String>, side: PositionSide, timestamp: DateTime<Utc>) -> Self {
        Self {
            signal_id: Uuid::new_v4(),
            symbol: symbol.into(),
            side,
            timestamp,
        }
    }
}

/// The stop-loss and staged take-profit prices for a new position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionLevels {
    pub stop_loss: Decimal,
    pub take_profit_1: Decimal,
    pub take_profit_2: Decimal,
    pub take_profit_3: Decimal,
}

/// A simulated leveraged position as recorded in the ledger.
///
/// The serde field names match the persisted ledger format (`exchange`, `sl`,
/// `tp1`..`tp3`). `tp1_hit` and `tp2_hit` default to `false` so records written
/// before those flags existed still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    side: PositionSide,
    entry: Decimal,
    #[serde(rename = "exchange")]
    venue: String,
    #[serde(rename = "sl")]
    stop_loss: Decimal,
    #[serde(rename = "tp1")]
    take_profit_1: Decimal,
    #[serde(rename = "tp2")]
    take_profit_2: Decimal,
    #[serde(rename = "tp3")]
    take_profit_3: Decimal,
    #[serde(default)]
    tp1_hit: bool,
    #[serde(default)]
    tp2_hit: bool,
}

impl Position {
    /// Opens a new position, rejecting levels that are not ordered in the trade direction.
    pub fn open(
        side: PositionSide,
        entry: Decimal,
        venue: impl Into<String>,
        levels: PositionLevels,
    ) -> Result<Self, CoreError> {
        let position = Self {
            side,
            entry,
            venue: venue.into(),
            stop_loss: levels.stop_loss,
            take_profit_1: levels.take_profit_1,
            take_profit_2: levels.take_profit_2,
            take_profit_3: levels.take_profit_3,
            tp1_hit: false,
            tp2_hit: false,
        };
        position.validate()?;
        Ok(position)
    }

    /// Checks the level ordering invariant.
    ///
    /// For a long: `sl < entry < tp1 < tp2 < tp3`, mirrored for a short. Once TP1
    /// has been hit the stop sits exactly at entry.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.entry <= Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "entry".to_string(),
                format!("must be positive, got {}", self.entry),
            ));
        }

        // Normalise both sides to "distance in the favourable direction".
        let dir = Decimal::from(self.side.direction());
        let sl = (self.stop_loss - self.entry) * dir;
        let tp1 = (self.take_profit_1 - self.entry) * dir;
        let tp2 = (self.take_profit_2 - self.entry) * dir;
        let tp3 = (self.take_profit_3 - self.entry) * dir;

        let stop_ok = if self.tp1_hit {
            sl == Decimal::ZERO
        } else {
            sl < Decimal::ZERO
        };
        if !stop_ok {
            return Err(CoreError::InvalidInput(
                "stop_loss".to_string(),
                format!(
                    "{} stop {} is on the wrong side of entry {}",
                    self.side, self.stop_loss, self.entry
                ),
            ));
        }
        if !(Decimal::ZERO < tp1 && tp1 < tp2 && tp2 < tp3) {
            return Err(CoreError::InvalidInput(
                "take_profit".to_string(),
                format!(
                    "{} targets {} / {} / {} are not ordered away from entry {}",
                    self.side, self.take_profit_1, self.take_profit_2, self.take_profit_3, self.entry
                ),
            ));
        }
        Ok(())
    }

    pub fn side(&self) -> PositionSide {
        self.side
    }

    pub fn entry(&self) -> Decimal {
        self.entry
    }

    pub fn venue(&self) -> &str {
        &self.venue
    }

    pub fn stop_loss(&self) -> Decimal {
        self.stop_loss
    }

    pub fn take_profit_1(&self) -> Decimal {
        self.take_profit_1
    }

    pub fn take_profit_2(&self) -> Decimal {
        self.take_profit_2
    }

    pub fn take_profit_3(&self) -> Decimal {
        self.take_profit_3
    }

    pub fn tp1_hit(&self) -> bool {
        self.tp1_hit
    }

    pub fn tp2_hit(&self) -> bool {
        self.tp2_hit
    }

    /// Records TP1 and ratchets the stop to break-even.
    pub fn mark_tp1(&mut self) {
        self.tp1_hit = true;
        self.stop_loss = self.entry;
    }

    pub fn mark_tp2(&mut self) {
        self.tp2_hit = true;
    }

    /// True if `price` is at or beyond `level` in the position's favourable direction.
    pub fn reached(&self, price: Decimal, level: Decimal) -> bool {
        match self.side {
            PositionSide::Long => price >= level,
            PositionSide::Short => price <= level,
        }
    }

    /// True if `price` is at or beyond the current stop in the adverse direction.
    pub fn stopped_out(&self, price: Decimal) -> bool {
        match self.side {
            PositionSide::Long => price <= self.stop_loss,
            PositionSide::Short => price >= self.stop_loss,
        }
    }
}
