use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::bank::BankIdentifier;

/// A single notification message as handed over by the intake boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub sender: String,
    pub body: String,
    /// Receipt time in epoch milliseconds.
    pub received_at_ms: i64,
}

impl InboundMessage {
    pub fn new(sender: impl Into<String>, body: impl Into<String>, received_at_ms: i64) -> Self {
        InboundMessage {
            sender: sender.into(),
            body: body.into(),
            received_at_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    /// Sender did not classify to any configured bank.
    NotBank,
    /// From a bank, waiting for extraction (auto-parse disabled or queued).
    Pending,
    Parsed,
    Failed,
}

impl fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseStatus::NotBank => write!(f, "not_bank"),
            ParseStatus::Pending => write!(f, "pending"),
            ParseStatus::Parsed => write!(f, "parsed"),
            ParseStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ParseStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_bank" => Ok(ParseStatus::NotBank),
            "pending" => Ok(ParseStatus::Pending),
            "parsed" => Ok(ParseStatus::Parsed),
            "failed" => Ok(ParseStatus::Failed),
            other => Err(format!("Unknown parse status: '{other}'")),
        }
    }
}

/// Every inbound message is recorded, bank or not, so extraction can be
/// audited and re-run. This is the sink-side envelope around [`InboundMessage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedMessage {
    pub id: Option<i64>,
    pub sender: String,
    pub body: String,
    pub received_at_ms: i64,
    pub from_bank: bool,
    pub bank_name: Option<String>,
    pub status: ParseStatus,
    pub parse_error: Option<String>,
    /// Link to the stored transaction when extraction succeeded.
    pub transaction_id: Option<i64>,
}

impl CapturedMessage {
    /// Wrap an inbound message with its directory classification.
    pub fn capture(message: &InboundMessage, matched: Option<&BankIdentifier>) -> Self {
        CapturedMessage {
            id: None,
            sender: message.sender.clone(),
            body: message.body.clone(),
            received_at_ms: message.received_at_ms,
            from_bank: matched.is_some(),
            bank_name: matched.map(|m| m.bank_name.clone()),
            status: if matched.is_some() {
                ParseStatus::Pending
            } else {
                ParseStatus::NotBank
            },
            parse_error: None,
            transaction_id: None,
        }
    }

    /// Sender with the resolved institution, e.g. "VM-HDFCBK (HDFC Bank)".
    pub fn formatted_sender(&self) -> String {
        match &self.bank_name {
            Some(bank) if self.from_bank => format!("{} ({bank})", self.sender),
            _ => self.sender.clone(),
        }
    }

    pub fn formatted_date_time(&self) -> String {
        match Local.timestamp_millis_opt(self.received_at_ms).single() {
            Some(dt) => dt.format("%d/%m/%y %H:%M").to_string(),
            None => String::new(),
        }
    }
}
