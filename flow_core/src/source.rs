use crate::types::RawTransaction;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Transaction source unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid response from transaction source: {0}")]
    InvalidResponse(String),
    #[error("Transaction source disabled: {0}")]
    Disabled(String),
}

/// A remote ledger index that serves an account's transaction history.
///
/// Pages are returned newest first. `before` is the primary signature of
/// the oldest transaction of the previous page; `None` asks for the newest
/// page. An empty page means the history is exhausted.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn get_page(
        &self,
        account_address: &str,
        page_limit: u32,
        before: Option<&str>,
    ) -> Result<Vec<RawTransaction>, SourceError>;
}
