use crate::timeframe::parse_request_date;
use crate::types::{AnalysisRequest, TransactionTypeFilter};
use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Message returned when tokenAddress, startDate or endDate is missing
pub const MISSING_PARAMETERS_MESSAGE: &str = "Missing required parameters.";

/// Analysis request as submitted by a client. Every field is optional at
/// this stage so that missing fields surface as validation errors rather
/// than deserialization failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisRequestBody {
    pub token_address: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub max_wallets: Option<f64>,
    pub transaction_type: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AnalysisRequestBody {
    /// Validate the body and build an [`AnalysisRequest`].
    ///
    /// Defaults: `maxWallets` to `default_max_wallets`, `transactionType` to
    /// both, `minAmount` to 0 and `maxAmount` to unbounded.
    pub fn into_request(self, default_max_wallets: usize) -> Result<AnalysisRequest> {
        let (token_address, start_date, end_date) = match (
            required(self.token_address),
            required(self.start_date),
            required(self.end_date),
        ) {
            (Some(token), Some(start), Some(end)) => (token, start, end),
            _ => {
                return Err(AnalysisError::Validation(
                    MISSING_PARAMETERS_MESSAGE.to_string(),
                ))
            }
        };

        let start_time = parse_request_date("startDate", &start_date)?;
        let end_time = parse_request_date("endDate", &end_date)?;

        let max_wallets = match self.max_wallets {
            None => default_max_wallets,
            Some(value) if value.is_finite() && value >= 1.0 && value.fract() == 0.0 => {
                value as usize
            }
            Some(value) => {
                return Err(AnalysisError::Validation(format!(
                    "maxWallets must be a positive integer, got {}",
                    value
                )))
            }
        };

        let transaction_type = match self.transaction_type.as_deref() {
            Some(value) => value.parse::<TransactionTypeFilter>()?,
            None => TransactionTypeFilter::Both,
        };

        AnalysisRequest::new(
            token_address,
            start_time,
            end_time,
            max_wallets,
            transaction_type,
            self.min_amount.unwrap_or(0.0),
            self.max_amount.unwrap_or(f64::MAX),
        )
    }
}
