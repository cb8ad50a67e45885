//! Bank detail validation for first-installment applications.

use vandana_common::{Error, PaymentDetails, Result};

/// Raw bank detail fields as submitted with an application. All fields are
/// optional at the transport layer; validation decides what is required.
#[derive(Debug, Clone, Default)]
pub struct BankDetailsForm {
    pub account_holder: Option<String>,
    pub account_number: Option<String>,
    pub confirm_account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub bank_name: Option<String>,
}

/// Validate a complete set of bank details. Returns the canonical
/// [`PaymentDetails`] to persist, or a field-level validation error for the
/// first problem found.
pub fn validate_bank_details(form: &BankDetailsForm) -> Result<PaymentDetails> {
    let account_holder = require(form.account_holder.as_deref(), "account_holder")?;

    let account_number = require(form.account_number.as_deref(), "account_number")?;
    if !account_number.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::validation(
            "account_number",
            "must contain only digits",
        ));
    }

    let confirm = require(form.confirm_account_number.as_deref(), "confirm_account_number")?;
    if confirm != account_number {
        return Err(Error::validation(
            "confirm_account_number",
            "does not match account_number",
        ));
    }

    let ifsc_code = require(form.ifsc_code.as_deref(), "ifsc_code")?;
    if !is_valid_ifsc(ifsc_code) {
        return Err(Error::validation(
            "ifsc_code",
            "must be 4 letters, a literal '0', then 6 alphanumeric characters",
        ));
    }

    let bank_name = require(form.bank_name.as_deref(), "bank_name")?;

    Ok(PaymentDetails {
        account_holder: account_holder.to_string(),
        account_number: account_number.to_string(),
        ifsc_code: ifsc_code.to_uppercase(),
        bank_name: bank_name.to_string(),
    })
}

/// IFSC-style routing code: 4 letters, a literal '0', then 6 alphanumeric
/// characters (11 characters total).
pub fn is_valid_ifsc(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 11
        && bytes[..4].iter().all(|b| b.is_ascii_alphabetic())
        && bytes[4] == b'0'
        && bytes[5..].iter().all(|b| b.is_ascii_alphanumeric())
}

fn require<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::validation(field, "is required")),
    }
}
