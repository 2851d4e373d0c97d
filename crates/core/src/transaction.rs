use chrono::{Local, TimeZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Currency of this deployment. The record keeps a currency field so the
/// model generalizes, but extraction always stamps this value.
pub const DEFAULT_CURRENCY: &str = "INR";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("amount must be non-negative, got {0}")]
    NegativeAmount(Decimal),
    #[error("merchant must be non-blank")]
    BlankMerchant,
}

/// A structured transaction derived from one bank message.
///
/// Only constructible through [`TransactionRecord::new`], which enforces the
/// two hard invariants: the amount is non-negative and the merchant is
/// non-blank. Extraction that cannot satisfy both must fail instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Option<i64>,
    pub amount: Decimal,
    pub currency: String,
    pub merchant: String,
    /// Account reference as printed in the message, often masked ("XX1234").
    pub account: String,
    pub reference: String,
    pub timestamp_ms: i64,
    /// Display date derived from the timestamp, "dd/MM/yy" in local time.
    pub date: String,
    /// Display time derived from the timestamp, "HH:mm" in local time.
    pub time: String,
    pub bank_name: String,
    /// Empty at creation; assigned by the user later.
    pub category: String,
    /// The message body verbatim, kept for audit.
    pub raw_text: String,
    /// Debit vs credit. Bank alerts are overwhelmingly debits.
    pub is_expense: bool,
    pub notes: String,
}

impl TransactionRecord {
    pub fn new(
        amount: Decimal,
        merchant: &str,
        account: &str,
        reference: &str,
        timestamp_ms: i64,
        bank_name: &str,
        raw_text: &str,
    ) -> Result<Self, RecordError> {
        if amount.is_sign_negative() {
            return Err(RecordError::NegativeAmount(amount));
        }
        let merchant = merchant.trim();
        if merchant.is_empty() {
            return Err(RecordError::BlankMerchant);
        }

        let (date, time) = derive_date_time(timestamp_ms);

        Ok(TransactionRecord {
            id: None,
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            merchant: merchant.to_string(),
            account: account.to_string(),
            reference: reference.to_string(),
            timestamp_ms,
            date,
            time,
            bank_name: bank_name.to_string(),
            category: String::new(),
            raw_text: raw_text.to_string(),
            is_expense: true,
            notes: String::new(),
        })
    }

    pub fn formatted_amount(&self) -> String {
        format!("₹{:.2}", self.amount)
    }

    pub fn formatted_date_time(&self) -> String {
        format!("{} {}", self.date, self.time)
    }
}

/// Display date and time strings for an epoch-millisecond timestamp, in the
/// deployment's local calendar. Out-of-range timestamps yield empty strings
/// rather than a panic.
pub fn derive_date_time(timestamp_ms: i64) -> (String, String) {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => (
            dt.format("%d/%m/%y").to_string(),
            dt.format("%H:%M").to_string(),
        ),
        None => (String::new(), String::new()),
    }
}
