use crate::address::validate_address;
use crate::{AnalysisError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a wallet's balance change within one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    /// Balance increased
    Buy,
    /// Balance decreased
    Sell,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which classifications a request wants back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionTypeFilter {
    Buy,
    Sell,
    #[default]
    Both,
}

impl TransactionTypeFilter {
    pub fn admits(&self, trade_type: TradeType) -> bool {
        match self {
            TransactionTypeFilter::Both => true,
            TransactionTypeFilter::Buy => trade_type == TradeType::Buy,
            TransactionTypeFilter::Sell => trade_type == TradeType::Sell,
        }
    }
}

impl FromStr for TransactionTypeFilter {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(TransactionTypeFilter::Buy),
            "sell" => Ok(TransactionTypeFilter::Sell),
            "both" | "" => Ok(TransactionTypeFilter::Both),
            other => Err(AnalysisError::Validation(format!(
                "Invalid transactionType '{}': expected buy, sell or both",
                other
            ))),
        }
    }
}

/// A validated analysis request. Built once per call.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub token_address: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub max_wallets: usize,
    pub transaction_type: TransactionTypeFilter,
    pub min_amount: f64,
    pub max_amount: f64,
}

impl AnalysisRequest {
    /// Build a request, rejecting an invalid token address, a zero wallet
    /// cap or an amount range that cannot hold any value.
    ///
    /// `start_time > end_time` is accepted; such a window simply selects nothing.
    pub fn new(
        token_address: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        max_wallets: usize,
        transaction_type: TransactionTypeFilter,
        min_amount: f64,
        max_amount: f64,
    ) -> Result<Self> {
        let token_address = token_address.into();
        validate_address("tokenAddress", &token_address)?;

        if max_wallets == 0 {
            return Err(AnalysisError::Validation(
                "maxWallets must be a positive integer".to_string(),
            ));
        }

        if !min_amount.is_finite() || min_amount < 0.0 {
            return Err(AnalysisError::Validation(
                "minAmount must be a non-negative number".to_string(),
            ));
        }

        if max_amount.is_nan() || max_amount < min_amount {
            return Err(AnalysisError::Validation(format!(
                "maxAmount ({}) must be greater than or equal to minAmount ({})",
                max_amount, min_amount
            )));
        }

        Ok(Self {
            token_address,
            start_time,
            end_time,
            max_wallets,
            transaction_type,
            min_amount,
            max_amount,
        })
    }

    /// True when |delta| lies inside [min_amount, max_amount]
    pub fn amount_in_range(&self, amount: f64) -> bool {
        amount >= self.min_amount && amount <= self.max_amount
    }
}

/// Token balance of one owner for one mint, before or after a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalanceSnapshot {
    pub owner: String,
    pub mint: String,
    /// Human-readable amount (raw amount scaled by decimals)
    pub ui_amount: f64,
}

impl TokenBalanceSnapshot {
    pub fn new(owner: impl Into<String>, mint: impl Into<String>, ui_amount: f64) -> Self {
        Self {
            owner: owner.into(),
            mint: mint.into(),
            ui_amount,
        }
    }
}

/// A transaction as yielded by a transaction source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Block time in unix seconds
    pub block_time: i64,
    /// Transaction signatures; the first one identifies the transaction
    pub signatures: Vec<String>,
    /// Transaction failed on-chain
    pub failed: bool,
    pub pre_token_balances: Option<Vec<TokenBalanceSnapshot>>,
    pub post_token_balances: Option<Vec<TokenBalanceSnapshot>>,
}

impl RawTransaction {
    pub fn primary_signature(&self) -> Option<&str> {
        self.signatures.first().map(String::as_str)
    }

    /// Block time in milliseconds, for comparison against request bounds
    pub fn block_time_millis(&self) -> i64 {
        self.block_time.saturating_mul(1000)
    }
}

/// One classified balance change, as returned to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub wallet: String,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    /// Absolute balance delta
    pub amount: f64,
    /// ISO-8601 block time, e.g. `2023-10-27T10:00:00.000Z`
    pub date: String,
    /// Set only for buys
    pub is_first_buy: Option<bool>,
    /// Set only for sells
    pub sell_percentage: Option<f64>,
    pub tx_signature: String,
}

/// Render unix seconds the way result rows carry dates
pub fn iso_date(block_time: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(block_time, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}
