use rust_decimal::Decimal;
use std::str::FromStr;

use kharcha_core::{InboundMessage, TransactionRecord};

/// Partial extraction result shared by both stages. Every field is optional;
/// the stage-success rules decide which ones are required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecoveredFields {
    pub amount: Option<Decimal>,
    pub merchant: Option<String>,
    pub reference: Option<String>,
    pub account: Option<String>,
}

impl RecoveredFields {
    /// Amount and merchant are the two fields extraction cannot do without.
    pub fn is_complete(&self) -> bool {
        self.amount.is_some()
            && self
                .merchant
                .as_deref()
                .is_some_and(|m| !m.trim().is_empty())
    }

    /// Build the final record. Reference and account default to empty — they
    /// never block success. Returns `None` when the required fields are
    /// missing or the record invariant rejects them.
    pub fn into_record(
        self,
        message: &InboundMessage,
        bank_name: &str,
    ) -> Option<TransactionRecord> {
        let amount = self.amount?;
        let merchant = self.merchant?;
        TransactionRecord::new(
            amount,
            &merchant,
            self.account.as_deref().unwrap_or(""),
            self.reference.as_deref().unwrap_or(""),
            message.received_at_ms,
            bank_name,
            &message.body,
        )
        .ok()
    }
}

/// Parse a captured amount string: thousands separators stripped, a bare
/// trailing decimal point tolerated ("500." parses as 500).
pub(crate) fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned = raw.replace(',', "");
    let cleaned = cleaned.trim_end_matches('.');
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(cleaned).ok()
}
