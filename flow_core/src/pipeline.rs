use crate::analyzer::analyze_transactions;
use crate::collector::WindowCollector;
use crate::limiter::limit_wallets;
use crate::source::TransactionSource;
use crate::types::{AnalysisRequest, ResultRow};
use crate::Result;
use tracing::info;

/// Run one analysis: collect the window, classify balance changes and cap
/// the wallet count. All intermediate state lives for this call only.
pub async fn run_analysis(
    source: &dyn TransactionSource,
    request: &AnalysisRequest,
    page_size: u32,
) -> Result<Vec<ResultRow>> {
    info!(
        "Analyzing {} from {} to {} (type={:?}, amount={}..={}, max_wallets={})",
        request.token_address,
        request.start_time,
        request.end_time,
        request.transaction_type,
        request.min_amount,
        request.max_amount,
        request.max_wallets
    );

    let collector = WindowCollector::new(source, page_size);
    let transactions = collector
        .collect(&request.token_address, request.start_time, request.end_time)
        .await?;

    info!("Collected {} transactions in window", transactions.len());

    let rows = analyze_transactions(&transactions, request);
    let limited = limit_wallets(rows, request.max_wallets);

    if limited.is_empty() {
        info!("No transactions found for {} in the requested window", request.token_address);
    } else {
        info!("Analysis produced {} rows", limited.len());
    }

    Ok(limited)
}
