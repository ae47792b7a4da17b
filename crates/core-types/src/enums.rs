use serde::{Deserialize, Serialize};

/// The direction of a simulated trade.
///
/// Persisted in upper case (`"LONG"` / `"SHORT"`), which is what older ledger
/// files contain. Lower-case spellings are accepted on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    #[serde(alias = "long", alias = "Long")]
    Long,
    #[serde(alias = "short", alias = "Short")]
    Short,
}

impl PositionSide {
    /// Returns `+1` for longs and `-1` for shorts, handy for mirroring level offsets.
    pub fn direction(&self) -> i8 {
        match self {
            PositionSide::Long => 1,
            PositionSide::Short => -1,
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

/// Whether a pivot is a local minimum or a local maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PivotKind {
    Low,
    High,
}

/// One of the three staged take-profit levels of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    Tp1,
    Tp2,
    Tp3,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Tp1 => write!(f, "TP1"),
            Target::Tp2 => write!(f, "TP2"),
            Target::Tp3 => write!(f, "TP3"),
        }
    }
}
