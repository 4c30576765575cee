use crate::types::ResultRow;
use std::collections::HashSet;
use tracing::debug;

/// Keep rows from at most `max_wallets` distinct wallets.
///
/// Wallets are admitted in row order. Once the cap is reached, rows of
/// wallets not yet admitted are dropped; admitted wallets keep all of their
/// rows, so the result is bounded by wallet count, not row count.
pub fn limit_wallets(rows: Vec<ResultRow>, max_wallets: usize) -> Vec<ResultRow> {
    let total = rows.len();
    let mut admitted: HashSet<String> = HashSet::new();

    let limited: Vec<ResultRow> = rows
        .into_iter()
        .filter(|row| {
            if admitted.contains(&row.wallet) {
                return true;
            }
            if admitted.len() >= max_wallets {
                return false;
            }
            admitted.insert(row.wallet.clone());
            true
        })
        .collect();

    debug!(
        "Wallet limit {} kept {} of {} rows from {} wallets",
        max_wallets,
        limited.len(),
        total,
        admitted.len()
    );

    limited
}
