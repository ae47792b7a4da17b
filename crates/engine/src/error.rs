use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Market data error: {0}")]
    Api(#[from] api_client::error::ApiError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] strategies::StrategyError),

    #[error("Risk management error: {0}")]
    Risk(#[from] risk::RiskError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("Position error: {0}")]
    Position(#[from] core_types::CoreError),
}
