use crate::error::EngineError;
use crate::evaluator;
use crate::watch::{WatchReport, watch_sma};
use alerter::{Notifier, notify_best_effort};
use api_client::{SeriesSampler, UniverseSource, base_asset};
use chrono::{DateTime, Utc};
use configuration::Config;
use core_types::Position;
use events::{PositionEvent, RunSummary};
use ledger::{Ledger, LedgerStore};
use risk::{OpeningGate, RiskManager, SimpleRiskManager};
use std::sync::Arc;
use strategies::{DivergenceParams, DivergenceStrategy, Strategy};

/// What a single run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub events: Vec<PositionEvent>,
    pub summary: RunSummary,
    pub watch: Option<WatchReport>,
}

/// The orchestrator for one invocation.
///
/// A run loads the ledger, re-prices every open position, scans the coin
/// universe for new divergence entries if the account has room, optionally runs
/// the SMA watch, and persists the ledger once at the end. External services are
/// injected so tests can substitute in-memory fakes.
pub struct Engine {
    config: Config,
    sampler: SeriesSampler,
    universe: Arc<dyn UniverseSource>,
    notifier: Arc<dyn Notifier>,
    strategy: Box<dyn Strategy>,
    risk_manager: Arc<dyn RiskManager>,
    store: LedgerStore,
}

impl Engine {
    /// Creates a new `Engine`, building the strategy and risk rules from `config`.
    pub fn new(
        config: Config,
        sampler: SeriesSampler,
        universe: Arc<dyn UniverseSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, EngineError> {
        let strategy = DivergenceStrategy::new(DivergenceParams::from(&config.scanner))?;
        let risk_manager = SimpleRiskManager::new(config.risk_management.clone())?;
        let store = LedgerStore::new(config.ledger.path.clone());

        Ok(Self {
            config,
            sampler,
            universe,
            notifier,
            strategy: Box::new(strategy),
            risk_manager: Arc::new(risk_manager),
            store,
        })
    }

    /// Runs once against the wall clock.
    pub async fn run_once(&self) -> Result<RunReport, EngineError> {
        self.run_once_at(Utc::now()).await
    }

    /// Runs once. `now` only decides whether the SMA proximity summary is sent.
    ///
    /// Per-symbol and per-position failures are logged and skipped; only a
    /// failure to persist the ledger fails the run.
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> Result<RunReport, EngineError> {
        let mut ledger = self.store.load(self.config.ledger.initial_balance);
        tracing::info!(
            balance = %ledger.balance,
            open = ledger.open_positions(),
            wins = ledger.wins,
            losses = ledger.losses,
            "Run started."
        );

        let mut events = self.evaluate_positions(&mut ledger).await;
        let closed = events.iter().filter(|e| e.closes_position()).count();

        let mut gate = OpeningGate::new(&self.config.risk_management);
        let scan_wanted = gate.can_open(ledger.balance, ledger.open_positions());
        if !scan_wanted {
            tracing::info!(
                available = %gate.available(ledger.balance, ledger.open_positions()),
                "No capacity for new positions. Skipping scan."
            );
        }

        let mut watch = None;
        if scan_wanted || self.config.sma_watch.enabled {
            match self.universe.list_symbols(self.config.scanner.universe_limit).await {
                Ok(coins) => {
                    tracing::info!(count = coins.len(), "Universe loaded.");
                    if scan_wanted {
                        events.extend(self.scan(&mut ledger, &mut gate, &coins).await);
                    }
                    if self.config.sma_watch.enabled {
                        watch = Some(
                            watch_sma(
                                &self.sampler,
                                self.notifier.as_ref(),
                                &self.config.sma_watch,
                                &coins,
                                now,
                            )
                            .await,
                        );
                    }
                }
                Err(e) => tracing::error!(error = %e, "Failed to load the coin universe."),
            }
        }

        self.store.save(&ledger)?;

        let summary = RunSummary {
            balance: ledger.balance,
            wins: ledger.wins,
            losses: ledger.losses,
            open_positions: ledger.open_positions(),
            opened: gate.opened(),
            closed,
        };
        tracing::info!(summary = %summary.message(), "Run finished.");

        Ok(RunReport {
            events,
            summary,
            watch,
        })
    }

    /// Re-prices every open position. Runs before any scan.
    async fn evaluate_positions(&self, ledger: &mut Ledger) -> Vec<PositionEvent> {
        let symbols: Vec<String> = ledger.positions.keys().cloned().collect();
        let mut events = Vec::new();

        for symbol in symbols {
            let Some(venue) = ledger.positions.get(&symbol).map(|p| p.venue().to_string()) else {
                continue;
            };
            let quote = match self
                .sampler
                .fetch_last_price(base_asset(&symbol), Some(&venue))
                .await
            {
                Ok(quote) => quote,
                Err(e) => {
                    tracing::warn!(%symbol, error = %e, "No price for open position. Leaving it unchanged.");
                    continue;
                }
            };

            let transitions = evaluator::evaluate(ledger, &symbol, quote.price, self.risk_manager.as_ref());
            for event in &transitions {
                tracing::info!(%symbol, price = %quote.price, venue = %quote.venue, ?event, "Position update");
                notify_best_effort(self.notifier.as_ref(), &event.message()).await;
            }
            events.extend(transitions);
        }
        events
    }

    /// Scans `coins` in rank order until the gate closes.
    async fn scan(&self, ledger: &mut Ledger, gate: &mut OpeningGate, coins: &[String]) -> Vec<PositionEvent> {
        let mut events = Vec::new();

        for coin in coins {
            if !gate.can_open(ledger.balance, ledger.open_positions()) {
                break;
            }
            if ledger.positions.keys().any(|pair| base_asset(pair) == coin.as_str()) {
                tracing::debug!(coin = %coin, "Position already open. Skipping.");
                continue;
            }

            match self.try_open(ledger, coin).await {
                Ok(Some(event)) => {
                    gate.record_open();
                    tracing::info!(coin = %coin, symbol = %event.symbol(), ?event, "Position opened");
                    notify_best_effort(self.notifier.as_ref(), &event.message()).await;
                    events.push(event);
                }
                Ok(None) => {}
                Err(EngineError::Api(e)) if e.is_skippable() => {
                    tracing::debug!(coin = %coin, error = %e, "Skipping symbol");
                }
                Err(e) => tracing::warn!(coin = %coin, error = %e, "Failed to evaluate symbol"),
            }
        }
        events
    }

    /// Samples `coin`, runs the strategy and, on a signal, opens a position at the current price.
    async fn try_open(&self, ledger: &mut Ledger, coin: &str) -> Result<Option<PositionEvent>, EngineError> {
        let scanner = &self.config.scanner;
        let min_bars = scanner.rsi_period + scanner.min_aligned_bars;
        let series = self
            .sampler
            .fetch(coin, &scanner.interval, scanner.candle_limit, min_bars)
            .await?;

        let Some(signal) = self.strategy.evaluate(&series.pair, &series.klines)? else {
            return Ok(None);
        };

        let quote = self.sampler.fetch_last_price(coin, Some(&series.venue)).await?;
        let levels = self.risk_manager.levels_for(signal.side, quote.price)?;
        let position = Position::open(signal.side, quote.price, quote.venue.clone(), levels)?;
        ledger.record_open(quote.pair.clone(), position)?;

        Ok(Some(PositionEvent::Opened {
            symbol: quote.pair,
            side: signal.side,
            venue: quote.venue,
            entry: quote.price,
            levels,
        }))
    }
}
