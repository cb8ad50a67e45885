use serde::{Deserialize, Serialize};

/// Bank payment details captured at the first installment application and
/// reused for subsequent installments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub account_holder: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub bank_name: String,
}

impl PaymentDetails {
    /// Mask for beneficiary-facing responses: only the last 4 digits of the
    /// account number remain visible.
    pub fn masked(&self) -> MaskedPaymentDetails {
        MaskedPaymentDetails {
            account_holder: self.account_holder.clone(),
            account_number: mask_account_number(&self.account_number),
            ifsc_code: self.ifsc_code.clone(),
            bank_name: self.bank_name.clone(),
        }
    }
}

/// Payment details with the account number masked to its last 4 digits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedPaymentDetails {
    pub account_holder: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub bank_name: String,
}

fn mask_account_number(account_number: &str) -> String {
    let visible = 4usize;
    let len = account_number.chars().count();
    if len <= visible {
        return "X".repeat(len);
    }
    let tail: String = account_number
        .chars()
        .skip(len - visible)
        .collect();
    format!("{}{}", "X".repeat(len - visible), tail)
}
