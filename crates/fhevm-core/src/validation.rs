//! Input validation helpers
//!
//! All functions here are pure and total: they never fail, they report.
//! Checks run in a fixed order and the first failing one wins.

use serde::{Deserialize, Serialize};

use crate::{format, EncryptedType};

/// Outcome of a validation check
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(reason.into()),
        }
    }

    /// Convert into a `Result`, carrying the reason on failure
    pub fn into_result(self) -> Result<(), String> {
        if self.valid {
            Ok(())
        } else {
            Err(self.error.unwrap_or_else(|| "Validation failed".to_string()))
        }
    }
}

/// True iff `s` is `0x` followed by exactly 40 hex digits (any case)
pub fn is_valid_address(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(hex) => hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

/// True iff `0 <= value <= 2^bits - 1` for `bits` in {8, 16, 32, 64}
pub fn is_within_uint_bounds(value: i128, bits: u32) -> bool {
    match bits {
        8 | 16 | 32 | 64 => value >= 0 && value <= (1i128 << bits) - 1,
        _ => false,
    }
}

/// Loose numeric check used by form inputs
pub fn is_valid_number(value: &str, min: Option<f64>, max: Option<f64>) -> bool {
    let num = match value.trim().parse::<f64>() {
        Ok(n) if !n.is_nan() => n,
        _ => return false,
    };
    if min.is_some_and(|m| num < m) {
        return false;
    }
    if max.is_some_and(|m| num > m) {
        return false;
    }
    true
}

/// Trim and strip angle brackets from free-form text
pub fn sanitize_input(input: &str) -> String {
    input.trim().replace(['<', '>'], "")
}

/// Validate the parameters of an encryption request
///
/// Order: contract address, user address, type tag, value parse, bounds.
pub fn validate_encryption_params(
    value: &str,
    ty: &str,
    contract_address: &str,
    user_address: &str,
) -> ValidationResult {
    if !is_valid_address(contract_address) {
        return ValidationResult::invalid("Invalid contract address format");
    }

    if !is_valid_address(user_address) {
        return ValidationResult::invalid("Invalid user address format");
    }

    let ty: EncryptedType = match ty.parse() {
        Ok(ty) => ty,
        Err(_) => return ValidationResult::invalid(format!("Unsupported type: {}", ty)),
    };

    let value = value.trim();
    match ty {
        EncryptedType::Bool => match value.to_lowercase().as_str() {
            "true" | "false" | "1" | "0" => ValidationResult::ok(),
            _ => ValidationResult::invalid("Value must be true or false"),
        },
        EncryptedType::Address => {
            if is_valid_address(value) {
                ValidationResult::ok()
            } else {
                ValidationResult::invalid("Value must be a valid address")
            }
        }
        _ => {
            let num: i128 = match value.parse() {
                Ok(n) => n,
                Err(_) => return ValidationResult::invalid("Value must be a valid number"),
            };
            if !is_within_uint_bounds(num, ty.bits()) {
                return ValidationResult::invalid(format!("Value must be within {} range", ty));
            }
            ValidationResult::ok()
        }
    }
}

/// Validate the parameters of a decryption request
pub fn validate_decryption_params(
    handle: &str,
    contract_address: &str,
    user_address: &str,
) -> ValidationResult {
    if handle.trim().is_empty() {
        return ValidationResult::invalid("Handle is required");
    }

    if format::parse_handle(handle).is_err() {
        return ValidationResult::invalid("Handle must be a decimal or 0x-hex integer");
    }

    if !is_valid_address(contract_address) {
        return ValidationResult::invalid("Invalid contract address format");
    }

    if !is_valid_address(user_address) {
        return ValidationResult::invalid("Invalid user address format");
    }

    ValidationResult::ok()
}

/// Validate a contract call description
pub fn validate_contract_params(contract_address: &str, method: &str) -> ValidationResult {
    if !is_valid_address(contract_address) {
        return ValidationResult::invalid("Invalid contract address format");
    }

    if method.trim().is_empty() {
        return ValidationResult::invalid("Method name is required");
    }

    ValidationResult::ok()
}

/// Validate a plain value transfer
pub fn validate_transaction(from: &str, to: &str, value: Option<&str>) -> ValidationResult {
    if !is_valid_address(from) {
        return ValidationResult::invalid("Invalid sender address");
    }

    if !is_valid_address(to) {
        return ValidationResult::invalid("Invalid recipient address");
    }

    if let Some(value) = value.filter(|v| !v.is_empty()) {
        if !is_valid_number(value, Some(0.0), None) {
            return ValidationResult::invalid("Invalid transaction value");
        }
    }

    ValidationResult::ok()
}
