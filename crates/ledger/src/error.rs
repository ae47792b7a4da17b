use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("I/O error on ledger file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Ledger file {path} uses unsupported schema version {version}")]
    UnsupportedVersion { path: PathBuf, version: u32 },

    #[error("Failed to serialize ledger: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("A position is already open for {0}")]
    AlreadyOpen(String),
}
