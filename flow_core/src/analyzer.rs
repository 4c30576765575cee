use crate::types::{iso_date, AnalysisRequest, RawTransaction, ResultRow, TokenBalanceSnapshot, TradeType};
use std::collections::HashSet;
use tracing::debug;

/// Wallets that already produced a buy row during one analysis call
#[derive(Debug, Default)]
pub struct FirstBuyWalletSet {
    wallets: HashSet<String>,
}

impl FirstBuyWalletSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a buy for `wallet`; returns true if it is the wallet's first
    pub fn record_buy(&mut self, wallet: &str) -> bool {
        if self.wallets.contains(wallet) {
            return false;
        }
        self.wallets.insert(wallet.to_string());
        true
    }

    pub fn contains(&self, wallet: &str) -> bool {
        self.wallets.contains(wallet)
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

/// Share of the position sold, using `post + sold` as the pre-sale balance.
/// Exact only when nothing else moved the wallet's balance in the same
/// transaction.
pub fn sell_percentage(amount_sold: f64, post_amount: f64) -> f64 {
    let position = post_amount + amount_sold;
    if position <= 0.0 {
        return 100.0;
    }
    (amount_sold / position) * 100.0
}

/// Turns chronologically ordered transactions into classified rows.
/// One instance per analysis call.
pub struct BalanceDeltaAnalyzer<'a> {
    request: &'a AnalysisRequest,
    first_buys: FirstBuyWalletSet,
}

impl<'a> BalanceDeltaAnalyzer<'a> {
    pub fn new(request: &'a AnalysisRequest) -> Self {
        Self {
            request,
            first_buys: FirstBuyWalletSet::new(),
        }
    }

    pub fn first_buys(&self) -> &FirstBuyWalletSet {
        &self.first_buys
    }

    /// Analyze transactions oldest first
    pub fn analyze(&mut self, transactions: &[RawTransaction]) -> Vec<ResultRow> {
        let mut rows = Vec::new();
        for transaction in transactions {
            self.analyze_transaction(transaction, &mut rows);
        }
        rows
    }

    /// Append the rows one transaction produces
    pub fn analyze_transaction(&mut self, transaction: &RawTransaction, rows: &mut Vec<ResultRow>) {
        if transaction.failed {
            debug!("Skipping failed transaction {:?}", transaction.primary_signature());
            return;
        }

        let mint = self.request.token_address.as_str();
        let (post_balances, pre_balances) = match (
            &transaction.post_token_balances,
            &transaction.pre_token_balances,
        ) {
            (Some(post), Some(pre)) => (
                balances_for_mint(post, mint),
                balances_for_mint(pre, mint),
            ),
            _ => {
                debug!(
                    "Skipping transaction {:?} without token balance snapshots",
                    transaction.primary_signature()
                );
                return;
            }
        };

        let (signature, date) = match (transaction.primary_signature(), iso_date(transaction.block_time)) {
            (Some(signature), Some(date)) => (signature, date),
            _ => {
                debug!("Skipping transaction without signature or valid block time");
                return;
            }
        };

        for post in post_balances {
            let pre_amount = pre_balances
                .iter()
                .find(|pre| pre.owner == post.owner)
                .map(|pre| pre.ui_amount)
                .unwrap_or(0.0);

            let delta = post.ui_amount - pre_amount;
            if delta == 0.0 {
                continue;
            }

            let amount = delta.abs();
            if !self.request.amount_in_range(amount) {
                debug!("{} change of {} outside amount range", post.owner, amount);
                continue;
            }

            let trade_type = if delta > 0.0 { TradeType::Buy } else { TradeType::Sell };
            if !self.request.transaction_type.admits(trade_type) {
                continue;
            }

            let (is_first_buy, sell_pct) = match trade_type {
                TradeType::Buy => (Some(self.first_buys.record_buy(&post.owner)), None),
                TradeType::Sell => (None, Some(sell_percentage(amount, post.ui_amount))),
            };

            rows.push(ResultRow {
                wallet: post.owner.clone(),
                trade_type,
                amount,
                date: date.clone(),
                is_first_buy,
                sell_percentage: sell_pct,
                tx_signature: signature.to_string(),
            });
        }
    }
}

fn balances_for_mint<'t>(
    balances: &'t [TokenBalanceSnapshot],
    mint: &str,
) -> Vec<&'t TokenBalanceSnapshot> {
    balances.iter().filter(|balance| balance.mint == mint).collect()
}

/// Classify every wallet balance change of the request's token
pub fn analyze_transactions(transactions: &[RawTransaction], request: &AnalysisRequest) -> Vec<ResultRow> {
    let mut analyzer = BalanceDeltaAnalyzer::new(request);
    let rows = analyzer.analyze(transactions);
    debug!(
        "Analyzed {} transactions into {} rows ({} first buyers)",
        transactions.len(),
        rows.len(),
        analyzer.first_buys().len()
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionTypeFilter;
    use chrono::{TimeZone, Utc};

    const TOKEN: &str = "So11111111111111111111111111111111111111112";
    const OTHER_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn request(filter: TransactionTypeFilter, min: f64, max: f64) -> AnalysisRequest {
        AnalysisRequest::new(
            TOKEN,
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            100,
            filter,
            min,
            max,
        )
        .unwrap()
    }

    fn balance(owner: &str, amount: f64) -> TokenBalanceSnapshot {
        TokenBalanceSnapshot::new(owner, TOKEN, amount)
    }

    fn tx(
        sig: &str,
        block_time: i64,
        pre: Vec<TokenBalanceSnapshot>,
        post: Vec<TokenBalanceSnapshot>,
    ) -> RawTransaction {
        RawTransaction {
            block_time,
            signatures: vec![sig.to_string()],
            failed: false,
            pre_token_balances: Some(pre),
            post_token_balances: Some(post),
        }
    }

    #[test]
    fn new_holder_is_a_first_buy() {
        let request = request(TransactionTypeFilter::Both, 0.0, 1_000_000.0);
        let txs = vec![tx("sig1", 1698400800, vec![], vec![balance("W", 10.0)])];

        let rows = analyze_transactions(&txs, &request);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.wallet, "W");
        assert_eq!(row.trade_type, TradeType::Buy);
        assert_eq!(row.amount, 10.0);
        assert_eq!(row.is_first_buy, Some(true));
        assert_eq!(row.sell_percentage, None);
        assert_eq!(row.date, "2023-10-27T10:00:00.000Z");
        assert_eq!(row.tx_signature, "sig1");
    }

    #[test]
    fn partial_sell_reports_percentage_of_position() {
        let request = request(TransactionTypeFilter::Both, 0.0, 1_000_000.0);
        let txs = vec![tx("sig1", 1698400800, vec![balance("W", 100.0)], vec![balance("W", 40.0)])];

        let rows = analyze_transactions(&txs, &request);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trade_type, TradeType::Sell);
        assert_eq!(rows[0].amount, 60.0);
        assert_eq!(rows[0].is_first_buy, None);
        assert_eq!(rows[0].sell_percentage, Some(60.0));
    }

    #[test]
    fn only_the_first_buy_per_wallet_is_flagged() {
        let request = request(TransactionTypeFilter::Both, 0.0, 1_000_000.0);
        let txs = vec![
            tx("b1", 100, vec![], vec![balance("W", 10.0)]),
            tx("s1", 200, vec![balance("W", 10.0)], vec![balance("W", 0.0)]),
            tx("b2", 300, vec![balance("W", 0.0)], vec![balance("W", 5.0)]),
            tx("b3", 400, vec![], vec![balance("V", 1.0)]),
        ];

        let rows = analyze_transactions(&txs, &request);
        let flags: Vec<_> = rows
            .iter()
            .map(|r| (r.tx_signature.as_str(), r.is_first_buy))
            .collect();

        assert_eq!(
            flags,
            vec![("b1", Some(true)), ("s1", None), ("b2", Some(false)), ("b3", Some(true))]
        );
        assert_eq!(rows[1].sell_percentage, Some(100.0));
    }

    #[test]
    fn failed_and_malformed_transactions_are_skipped() {
        let request = request(TransactionTypeFilter::Both, 0.0, 1_000_000.0);
        let mut failed = tx("failed", 100, vec![], vec![balance("W", 10.0)]);
        failed.failed = true;
        let mut missing_pre = tx("missing", 200, vec![], vec![balance("W", 10.0)]);
        missing_pre.pre_token_balances = None;

        let rows = analyze_transactions(&[failed, missing_pre], &request);

        assert!(rows.is_empty());
    }

    #[test]
    fn skipped_failed_buy_does_not_consume_first_buy() {
        let request = request(TransactionTypeFilter::Both, 0.0, 1_000_000.0);
        let mut failed = tx("failed", 100, vec![], vec![balance("W", 10.0)]);
        failed.failed = true;
        let ok = tx("ok", 200, vec![], vec![balance("W", 10.0)]);

        let rows = analyze_transactions(&[failed, ok], &request);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].is_first_buy, Some(true));
    }

    #[test]
    fn other_mints_and_unchanged_balances_are_ignored() {
        let request = request(TransactionTypeFilter::Both, 0.0, 1_000_000.0);
        let txs = vec![tx(
            "sig",
            100,
            vec![balance("W", 5.0), TokenBalanceSnapshot::new("X", OTHER_MINT, 0.0)],
            vec![balance("W", 5.0), TokenBalanceSnapshot::new("X", OTHER_MINT, 50.0)],
        )];

        assert!(analyze_transactions(&txs, &request).is_empty());
    }

    #[test]
    fn amount_filter_is_inclusive() {
        let request = request(TransactionTypeFilter::Both, 10.0, 20.0);
        let txs = vec![tx(
            "sig",
            100,
            vec![],
            vec![
                balance("A", 9.0),
                balance("B", 10.0),
                balance("C", 20.0),
                balance("D", 21.0),
            ],
        )];

        let rows = analyze_transactions(&txs, &request);
        let wallets: Vec<_> = rows.iter().map(|r| r.wallet.as_str()).collect();

        assert_eq!(wallets, vec!["B", "C"]);
        assert!(rows.iter().all(|r| r.amount >= 10.0 && r.amount <= 20.0));
    }

    #[test]
    fn type_filter_drops_other_direction_without_recording_buys() {
        let sells_only = request(TransactionTypeFilter::Sell, 0.0, 1_000_000.0);
        let txs = vec![tx(
            "sig",
            100,
            vec![balance("A", 10.0), balance("B", 10.0)],
            vec![balance("A", 15.0), balance("B", 2.0)],
        )];

        let mut analyzer = BalanceDeltaAnalyzer::new(&sells_only);
        let rows = analyzer.analyze(&txs);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].wallet, "B");
        assert_eq!(rows[0].trade_type, TradeType::Sell);
        assert!(analyzer.first_buys().is_empty());
    }

    #[test]
    fn rows_follow_snapshot_order_within_a_transaction() {
        let request = request(TransactionTypeFilter::Both, 0.0, 1_000_000.0);
        let txs = vec![tx(
            "sig",
            100,
            vec![balance("B", 10.0)],
            vec![balance("C", 3.0), balance("B", 4.0), balance("A", 1.0)],
        )];

        let rows = analyze_transactions(&txs, &request);
        let wallets: Vec<_> = rows.iter().map(|r| r.wallet.as_str()).collect();

        assert_eq!(wallets, vec!["C", "B", "A"]);
    }

    #[test]
    fn first_buy_set_records_once() {
        let mut set = FirstBuyWalletSet::new();
        assert!(set.record_buy("W"));
        assert!(!set.record_buy("W"));
        assert!(set.contains("W"));
        assert_eq!(set.len(), 1);
    }
}
