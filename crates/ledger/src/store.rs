//! Loading and atomically saving the ledger file.

use crate::error::LedgerError;
use crate::{LEDGER_VERSION, Ledger};
use rust_decimal::Decimal;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// The on-disk home of a [`Ledger`].
///
/// A single writer is assumed; two concurrent runs against the same file will
/// lose one run's updates.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the ledger file. `Ok(None)` means the file does not exist yet.
    pub fn read(&self) -> Result<Option<Ledger>, LedgerError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(LedgerError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let mut ledger: Ledger = serde_json::from_str(&content).map_err(|e| LedgerError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        if ledger.version > LEDGER_VERSION {
            return Err(LedgerError::UnsupportedVersion {
                path: self.path.clone(),
                version: ledger.version,
            });
        }
        if ledger.version < LEDGER_VERSION {
            // Schema 0 only lacked the hit flags, which serde already defaulted.
            tracing::info!(from = ledger.version, to = LEDGER_VERSION, "Upgrading ledger schema.");
            ledger.version = LEDGER_VERSION;
        }

        ledger.discard_invalid();
        Ok(Some(ledger))
    }

    /// Loads the ledger, falling back to a fresh one.
    ///
    /// A missing file yields a fresh ledger silently. An unreadable or
    /// unparseable file is renamed to `<name>.quarantined` and a fresh ledger is
    /// returned, so the run can still proceed.
    pub fn load(&self, initial_balance: Decimal) -> Ledger {
        match self.read() {
            Ok(Some(ledger)) => {
                tracing::debug!(
                    path = %self.path.display(),
                    balance = %ledger.balance,
                    positions = ledger.open_positions(),
                    "Ledger loaded."
                );
                ledger
            }
            Ok(None) => {
                tracing::info!(path = %self.path.display(), "No ledger file found. Starting fresh.");
                Ledger::new(initial_balance)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ledger is unusable. Starting fresh.");
                self.quarantine();
                Ledger::new(initial_balance)
            }
        }
    }

    /// Writes the ledger to a temporary sibling file, then renames it into place.
    pub fn save(&self, ledger: &Ledger) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(ledger)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LedgerError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp_path = self.sibling("tmp");
        let written = fs::File::create(&tmp_path).and_then(|mut file| {
            file.write_all(json.as_bytes())?;
            file.sync_all()
        });
        if let Err(source) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(LedgerError::Io { path: tmp_path, source });
        }

        fs::rename(&tmp_path, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            LedgerError::Io {
                path: self.path.clone(),
                source,
            }
        })?;

        tracing::debug!(path = %self.path.display(), "Ledger saved.");
        Ok(())
    }

    fn quarantine(&self) {
        let target = self.sibling("quarantined");
        match fs::rename(&self.path, &target) {
            Ok(()) => tracing::warn!(
                from = %self.path.display(),
                to = %target.display(),
                "Quarantined unreadable ledger file."
            ),
            Err(e) => tracing::error!(error = %e, path = %self.path.display(), "Failed to quarantine ledger file."),
        }
    }

    /// `ledger.json` -> `ledger.json.<suffix>` in the same directory.
    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger".into());
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }
}
