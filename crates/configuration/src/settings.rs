use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section has defaults, so an empty (or missing) `config.toml` yields a
/// runnable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub risk_management: RiskManagement,
    pub scanner: ScannerConfig,
    pub data: DataConfig,
    pub alerts: AlertsConfig,
    pub sma_watch: SmaWatchConfig,
    pub log: LogConfig,
}

impl Config {
    /// Rejects values that would make the simulation meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.risk_management.validate()?;
        self.scanner.validate()?;

        if self.ledger.initial_balance < Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "ledger.initial_balance cannot be negative".to_string(),
            ));
        }
        if self.data.sources.is_empty() {
            return Err(ConfigError::ValidationError(
                "data.sources must name at least one market data source".to_string(),
            ));
        }
        if self.data.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "data.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.sma_watch.enabled && self.sma_watch.period == 0 {
            return Err(ConfigError::ValidationError(
                "sma_watch.period must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the ledger lives and what a fresh ledger starts with.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub path: PathBuf,
    pub initial_balance: Decimal,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("ledger.json"),
            initial_balance: dec!(1000),
        }
    }
}

/// Contains parameters for trade-level risk management.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskManagement {
    /// Balance reserved per open position. Gates how many positions may be open.
    pub margin_per_trade: Decimal,
    /// Notional size is `margin_per_trade * leverage`.
    pub leverage: Decimal,
    /// Fixed amount deducted from the balance when a position is stopped out before TP1.
    pub loss_per_trade: Decimal,
    /// Distance from entry to the initial stop, as a fraction (0.02 = 2%).
    pub stop_loss_pct: Decimal,
    pub tp1_pct: Decimal,
    pub tp2_pct: Decimal,
    pub tp3_pct: Decimal,
    /// Fraction of notional realised at each target. Must sum to 1.
    pub tp1_allocation: Decimal,
    pub tp2_allocation: Decimal,
    pub tp3_allocation: Decimal,
    /// Upper bound on positions opened in a single invocation.
    pub max_new_positions_per_run: usize,
}

impl Default for RiskManagement {
    fn default() -> Self {
        Self {
            margin_per_trade: dec!(100),
            leverage: dec!(10),
            loss_per_trade: dec!(20),
            stop_loss_pct: dec!(0.02),
            tp1_pct: dec!(0.015),
            tp2_pct: dec!(0.03),
            tp3_pct: dec!(0.05),
            tp1_allocation: dec!(0.25),
            tp2_allocation: dec!(0.5),
            tp3_allocation: dec!(0.25),
            max_new_positions_per_run: 1,
        }
    }
}

impl RiskManagement {
    /// The simulated trade value used to compute partial-profit amounts.
    pub fn notional(&self) -> Decimal {
        self.margin_per_trade * self.leverage
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.margin_per_trade <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "risk_management.margin_per_trade must be greater than 0".to_string(),
            ));
        }
        if self.leverage < Decimal::ONE {
            return Err(ConfigError::ValidationError(
                "risk_management.leverage must be at least 1".to_string(),
            ));
        }
        if self.loss_per_trade < Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "risk_management.loss_per_trade cannot be negative".to_string(),
            ));
        }
        if self.stop_loss_pct <= Decimal::ZERO || self.stop_loss_pct >= Decimal::ONE {
            return Err(ConfigError::ValidationError(
                "risk_management.stop_loss_pct must be between 0 and 1".to_string(),
            ));
        }
        if !(Decimal::ZERO < self.tp1_pct && self.tp1_pct < self.tp2_pct && self.tp2_pct < self.tp3_pct)
        {
            return Err(ConfigError::ValidationError(
                "risk_management take-profit percentages must satisfy 0 < tp1 < tp2 < tp3".to_string(),
            ));
        }
        // Short targets sit at entry * (1 - tp3_pct), which must stay positive.
        if self.tp3_pct >= Decimal::ONE {
            return Err(ConfigError::ValidationError(
                "risk_management.tp3_pct must be below 1".to_string(),
            ));
        }
        let allocations = [self.tp1_allocation, self.tp2_allocation, self.tp3_allocation];
        if allocations.iter().any(|a| *a < Decimal::ZERO || *a > Decimal::ONE) {
            return Err(ConfigError::ValidationError(
                "risk_management allocations must each be between 0 and 1".to_string(),
            ));
        }
        if allocations.iter().sum::<Decimal>() != Decimal::ONE {
            return Err(ConfigError::ValidationError(
                "risk_management allocations must sum to 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters for the divergence scan over the coin universe.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Kline interval requested from the data sources (e.g. "4h").
    pub interval: String,
    /// Number of bars requested per symbol.
    pub candle_limit: usize,
    /// Bars that must remain after the oscillator warm-up is trimmed.
    pub min_aligned_bars: usize,
    /// Half-width of the pivot window.
    pub pivot_order: usize,
    pub rsi_period: usize,
    /// How many top market-cap coins to pull from the universe source.
    pub universe_limit: usize,
    /// Stable and wrapped assets that are never scanned (case-insensitive).
    pub denylist: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interval: "4h".to_string(),
            candle_limit: 250,
            min_aligned_bars: 50,
            pivot_order: 4,
            rsi_period: 14,
            universe_limit: 120,
            denylist: [
                "usdt", "usdc", "dai", "fdusd", "pyusd", "usde", "steth", "wbtc", "weth", "rlusd",
                "usdg", "usds", "meth", "usdd", "lseth", "usd1",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ScannerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.pivot_order == 0 {
            return Err(ConfigError::ValidationError(
                "scanner.pivot_order must be greater than 0".to_string(),
            ));
        }
        if self.rsi_period == 0 {
            return Err(ConfigError::ValidationError(
                "scanner.rsi_period must be greater than 0".to_string(),
            ));
        }
        if self.candle_limit <= self.rsi_period {
            return Err(ConfigError::ValidationError(format!(
                "scanner.candle_limit ({}) must exceed scanner.rsi_period ({})",
                self.candle_limit, self.rsi_period
            )));
        }
        if self.candle_limit < self.rsi_period + self.min_aligned_bars {
            tracing::warn!(
                candle_limit = self.candle_limit,
                min_aligned_bars = self.min_aligned_bars,
                "scanner.candle_limit leaves fewer aligned bars than required; no signal can fire"
            );
        }
        Ok(())
    }
}

/// A market data backend. The order in `DataConfig::sources` is the fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Binance,
    Kraken,
    #[serde(alias = "gate", alias = "gate_io")]
    Gateio,
}

impl Venue {
    /// The identifier written into the ledger's `exchange` field.
    pub fn id(&self) -> &'static str {
        match self {
            Venue::Binance => "binance",
            Venue::Kraken => "kraken",
            Venue::Gateio => "gateio",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub sources: Vec<Venue>,
    /// Independent timeout applied to every call against a data source.
    pub request_timeout_secs: u64,
    pub coingecko_url: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            sources: vec![Venue::Binance, Venue::Kraken, Venue::Gateio],
            request_timeout_secs: 10,
            coingecko_url: "https://api.coingecko.com/api/v3/coins/markets".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub discord: DiscordConfig,
    pub telegram: TelegramConfig,
}

impl AlertsConfig {
    /// Fills empty secrets from the conventional bare environment variables.
    pub fn fill_from_env(&mut self) {
        fill(&mut self.discord.webhook_url, "DISCORD_WEBHOOK_URL");
        fill(&mut self.telegram.token, "TELEGRAM_TOKEN");
        fill(&mut self.telegram.chat_id, "TELEGRAM_CHAT_ID");
    }
}

fn fill(slot: &mut String, var: &str) {
    if slot.is_empty()
        && let Ok(value) = std::env::var(var)
    {
        *slot = value;
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub webhook_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

/// A named timeframe for the SMA watch, e.g. `{ label = "Daily", interval = "1d" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Timeframe {
    pub label: String,
    pub interval: String,
}

/// Parameters for the long-period moving average touch/proximity watch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmaWatchConfig {
    pub enabled: bool,
    pub period: usize,
    pub candle_limit: usize,
    /// Relative distance to the SMA that counts as "close to" (0.02 = 2%).
    pub proximity_pct: Decimal,
    /// The proximity summary is sent only during the first N minutes of each hour.
    pub summary_window_minutes: u32,
    pub timeframes: Vec<Timeframe>,
}

impl Default for SmaWatchConfig {
    fn default() -> Self {
        let tf = |label: &str, interval: &str| Timeframe {
            label: label.to_string(),
            interval: interval.to_string(),
        };
        Self {
            enabled: false,
            period: 200,
            candle_limit: 250,
            proximity_pct: dec!(0.02),
            summary_window_minutes: 15,
            timeframes: vec![
                tf("4h", "4h"),
                tf("Daily", "1d"),
                tf("3-Day", "3d"),
                tf("Weekly", "1w"),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "sentinel.log".to_string(),
        }
    }
}
