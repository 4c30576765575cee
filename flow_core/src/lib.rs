//! Token flow analysis: window collection over a paginated transaction
//! history, per-wallet balance-delta classification and result limiting.

pub mod address;
pub mod analyzer;
pub mod collector;
pub mod export;
pub mod format;
pub mod limiter;
pub mod pipeline;
pub mod request;
pub mod source;
pub mod timeframe;
pub mod types;

pub use address::{is_valid_solana_address, validate_address};
pub use analyzer::{analyze_transactions, BalanceDeltaAnalyzer, FirstBuyWalletSet};
pub use collector::WindowCollector;
pub use export::{to_csv, CSV_HEADERS};
pub use format::{format_date, format_number};
pub use limiter::limit_wallets;
pub use pipeline::run_analysis;
pub use request::AnalysisRequestBody;
pub use source::{SourceError, TransactionSource};
pub use types::{
    AnalysisRequest, RawTransaction, ResultRow, TokenBalanceSnapshot, TradeType,
    TransactionTypeFilter,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Transaction source error: {0}")]
    Source(#[from] SourceError),
    #[error("Export error: {0}")]
    Export(String),
}

impl AnalysisError {
    /// True when the failure is attributable to the caller's request
    pub fn is_validation(&self) -> bool {
        matches!(self, AnalysisError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
