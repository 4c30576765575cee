use flow_core::{RawTransaction, TokenBalanceSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// JSON-RPC envelope
#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Entry of a `getSignaturesForAddress` page
#[derive(Debug, Clone, Deserialize)]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(default)]
    pub slot: u64,
    #[serde(rename = "blockTime")]
    pub block_time: Option<i64>,
    pub err: Option<Value>,
}

/// `getTransaction` result with `jsonParsed` encoding; only the fields the
/// analysis reads are modelled
#[derive(Debug, Clone, Deserialize)]
pub struct RpcTransaction {
    #[serde(default)]
    pub slot: u64,
    #[serde(rename = "blockTime")]
    pub block_time: Option<i64>,
    pub meta: Option<RpcTransactionMeta>,
    pub transaction: RpcTransactionBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcTransactionBody {
    pub signatures: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcTransactionMeta {
    pub err: Option<Value>,
    #[serde(rename = "preTokenBalances")]
    pub pre_token_balances: Option<Vec<RpcTokenBalance>>,
    #[serde(rename = "postTokenBalances")]
    pub post_token_balances: Option<Vec<RpcTokenBalance>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcTokenBalance {
    #[serde(rename = "accountIndex")]
    pub account_index: u32,
    pub mint: String,
    pub owner: Option<String>,
    #[serde(rename = "uiTokenAmount")]
    pub ui_token_amount: RpcUiTokenAmount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcUiTokenAmount {
    pub amount: String,
    pub decimals: u8,
    #[serde(rename = "uiAmount")]
    pub ui_amount: Option<f64>,
    #[serde(rename = "uiAmountString")]
    pub ui_amount_string: Option<String>,
}

impl RpcUiTokenAmount {
    /// Display amount; `uiAmount` is null for zero balances on some nodes
    pub fn value(&self) -> f64 {
        if let Some(amount) = self.ui_amount {
            return amount;
        }
        if let Some(amount) = self
            .ui_amount_string
            .as_deref()
            .and_then(|s| s.parse::<f64>().ok())
        {
            return amount;
        }
        self.amount
            .parse::<f64>()
            .map(|raw| raw / 10_f64.powi(self.decimals as i32))
            .unwrap_or(0.0)
    }
}

fn to_snapshots(balances: Option<Vec<RpcTokenBalance>>) -> Option<Vec<TokenBalanceSnapshot>> {
    balances.map(|balances| {
        balances
            .into_iter()
            .filter_map(|balance| {
                let ui_amount = balance.ui_token_amount.value();
                match balance.owner {
                    Some(owner) => Some(TokenBalanceSnapshot::new(owner, balance.mint, ui_amount)),
                    None => {
                        debug!(
                            "Dropping token balance without owner (account index {})",
                            balance.account_index
                        );
                        None
                    }
                }
            })
            .collect()
    })
}

impl RpcTransaction {
    /// Convert to the analysis representation. Block time and failure flag
    /// fall back to the signature entry when the body lacks them.
    pub fn into_raw(self, info: &SignatureInfo) -> Option<RawTransaction> {
        let block_time = self.block_time.or(info.block_time)?;

        let mut signatures = self.transaction.signatures;
        if signatures.is_empty() {
            signatures.push(info.signature.clone());
        }

        let (failed, pre_token_balances, post_token_balances) = match self.meta {
            Some(meta) => (
                meta.err.is_some() || info.err.is_some(),
                to_snapshots(meta.pre_token_balances),
                to_snapshots(meta.post_token_balances),
            ),
            None => (info.err.is_some(), None, None),
        };

        Some(RawTransaction {
            block_time,
            signatures,
            failed,
            pre_token_balances,
            post_token_balances,
        })
    }
}

impl SignatureInfo {
    /// Placeholder for a signature whose body could not be used. Keeps the
    /// page intact for cursoring; the analyzer skips it for lack of balance
    /// snapshots. `fallback_block_time` dates entries the node left undated.
    pub fn into_bodiless(self, fallback_block_time: i64) -> RawTransaction {
        RawTransaction {
            block_time: self.block_time.unwrap_or(fallback_block_time),
            failed: self.err.is_some(),
            signatures: vec![self.signature],
            pre_token_balances: None,
            post_token_balances: None,
        }
    }
}

/// Token metadata from the DAS `getAsset` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub id: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

impl TokenMetadata {
    /// Extract metadata from a `getAsset` result object
    pub fn from_asset(asset: &Value) -> Option<Self> {
        let id = asset.get("id")?.as_str()?.to_string();
        let metadata = asset.get("content").and_then(|c| c.get("metadata"));
        let token_info = asset.get("token_info");

        let text = |value: Option<&Value>| {
            value
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let name = text(metadata.and_then(|m| m.get("name")));
        let symbol = text(metadata.and_then(|m| m.get("symbol")))
            .or_else(|| text(token_info.and_then(|t| t.get("symbol"))));
        let decimals = token_info
            .and_then(|t| t.get("decimals"))
            .and_then(Value::as_u64)
            .and_then(|d| u8::try_from(d).ok());

        Some(Self {
            id,
            name,
            symbol,
            decimals,
        })
    }
}
