use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    AlertsConfig, Config, DataConfig, DiscordConfig, LedgerConfig, LogConfig, RiskManagement,
    ScannerConfig, SmaWatchConfig, TelegramConfig, Timeframe, Venue,
};

/// Environment variable prefix for overriding any configuration key,
/// e.g. `SENTINEL_RISK_MANAGEMENT__MARGIN_PER_TRADE=50`.
pub const ENV_PREFIX: &str = "SENTINEL";

/// Loads the application configuration.
///
/// Sources are layered in order: built-in defaults, the TOML file at `path`
/// (optional unless the caller asked for it explicitly), then `SENTINEL_*`
/// environment variables. Alert secrets additionally fall back to the bare
/// `DISCORD_WEBHOOK_URL`, `TELEGRAM_TOKEN` and `TELEGRAM_CHAT_ID` variables.
pub fn load_config(path: &Path, required: bool) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(required))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut config = builder.try_deserialize::<Config>()?;
    config.alerts.fill_from_env();
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn loads_overrides_from_toml_and_keeps_defaults_elsewhere() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[ledger]
path = "state/ledger.json"

[risk_management]
margin_per_trade = 50
max_new_positions_per_run = 2

[scanner]
interval = "1d"

[data]
sources = ["kraken", "binance"]
"#
        )
        .unwrap();

        let config = load_config(file.path(), true).unwrap();
        assert_eq!(config.ledger.path, std::path::PathBuf::from("state/ledger.json"));
        assert_eq!(config.risk_management.margin_per_trade, dec!(50));
        assert_eq!(config.risk_management.max_new_positions_per_run, 2);
        assert_eq!(config.risk_management.leverage, dec!(10));
        assert_eq!(config.scanner.interval, "1d");
        assert_eq!(config.scanner.pivot_order, 4);
        assert_eq!(config.data.sources, vec![Venue::Kraken, Venue::Binance]);
    }

    #[test]
    fn missing_optional_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml"), false).unwrap();
        assert_eq!(config.scanner.min_aligned_bars, 50);
        assert_eq!(config.ledger.initial_balance, dec!(1000));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[risk_management]\nmargin_per_trade = 0").unwrap();
        assert!(matches!(
            load_config(file.path(), true),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
