pub mod bank;
pub mod message;
pub mod transaction;

pub use bank::{BankDirectory, BankIdentifier};
pub use message::{CapturedMessage, InboundMessage, ParseStatus};
pub use transaction::{derive_date_time, RecordError, TransactionRecord, DEFAULT_CURRENCY};
