use crate::{AnalysisError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Base58 alphabet (no 0, O, I, l), 32 to 44 characters
const SOLANA_ADDRESS_PATTERN: &str = r"^[1-9A-HJ-NP-Za-km-z]{32,44}$";

fn address_regex() -> &'static Regex {
    static ADDRESS_REGEX: OnceLock<Regex> = OnceLock::new();
    ADDRESS_REGEX.get_or_init(|| Regex::new(SOLANA_ADDRESS_PATTERN).unwrap())
}

/// Syntactic check that a string looks like a Solana account address.
/// Does not decode the key or check that it lies on the curve.
pub fn is_valid_solana_address(address: &str) -> bool {
    address_regex().is_match(address)
}

/// Validate an address, returning a validation error naming the field
pub fn validate_address(field: &str, address: &str) -> Result<()> {
    if address.is_empty() {
        return Err(AnalysisError::Validation(format!("{} cannot be empty", field)));
    }

    if !is_valid_solana_address(address) {
        return Err(AnalysisError::Validation(format!(
            "Invalid {}: '{}' is not a valid Solana address",
            field, address
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_mints() {
        assert!(is_valid_solana_address("So11111111111111111111111111111111111111112"));
        assert!(is_valid_solana_address("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"));
        assert!(is_valid_solana_address("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263"));
    }

    #[test]
    fn rejects_bad_length_and_alphabet() {
        assert!(!is_valid_solana_address(""));
        assert!(!is_valid_solana_address("abc"));
        // 45 characters
        assert!(!is_valid_solana_address("So111111111111111111111111111111111111111112x"));
        // '0', 'O', 'I' and 'l' are outside base58
        assert!(!is_valid_solana_address("0o11111111111111111111111111111111111111112"));
        assert!(!is_valid_solana_address("OI11111111111111111111111111111111111111112"));
        assert!(!is_valid_solana_address("So1111111111111111111111111111111111111111l"));
        assert!(!is_valid_solana_address("So11111111111111111111 1111111111111111112"));
    }

    #[test]
    fn validate_address_names_the_field() {
        let err = validate_address("tokenAddress", "not-an-address").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("tokenAddress"));

        assert!(validate_address("tokenAddress", "").is_err());
        assert!(validate_address("tokenAddress", "So11111111111111111111111111111111111111112").is_ok());
    }
}
