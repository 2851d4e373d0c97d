//! The persistence boundary consumed by the intake flow.
//!
//! The engine itself never talks to storage; it hands every outcome to a
//! [`PersistenceSink`]. Two implementations ship here: an in-memory sink for
//! tests and a sqlite-backed sink over the storage crate.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use thiserror::Error;

use kharcha_core::{CapturedMessage, ParseStatus, TransactionRecord};
use kharcha_storage::DbPool;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("unknown message id {0}")]
    UnknownMessage(i64),
}

pub type SinkFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SinkError>> + Send + 'a>>;

/// Accepts either a structured record for storage, or a failure reason to
/// mark a captured message as attempted-but-failed.
pub trait PersistenceSink: Send + Sync {
    /// Record an inbound message (bank or not). Returns its storage id.
    fn store_captured<'a>(&'a self, message: &'a CapturedMessage) -> SinkFuture<'a, i64>;

    /// Store an extracted transaction. Returns its storage id.
    fn store_transaction<'a>(&'a self, record: &'a TransactionRecord) -> SinkFuture<'a, i64>;

    /// Link a captured message to its extracted transaction.
    fn mark_parsed<'a>(&'a self, message_id: i64, transaction_id: i64) -> SinkFuture<'a, ()>;

    /// Mark a captured message as attempted-but-failed, with the reason.
    fn mark_failed<'a>(&'a self, message_id: i64, reason: &'a str) -> SinkFuture<'a, ()>;
}

// ── In-memory sink (used for tests) ───────────────────────────────────────────

#[derive(Default)]
struct MemoryState {
    messages: Vec<CapturedMessage>,
    transactions: Vec<TransactionRecord>,
}

/// Keeps everything in two vectors. Ids are 1-based insertion indices.
#[derive(Default)]
pub struct MemorySink {
    state: Mutex<MemoryState>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<CapturedMessage> {
        self.state.lock().unwrap().messages.clone()
    }

    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.state.lock().unwrap().transactions.clone()
    }
}

impl PersistenceSink for MemorySink {
    fn store_captured<'a>(&'a self, message: &'a CapturedMessage) -> SinkFuture<'a, i64> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            let id = state.messages.len() as i64 + 1;
            let mut stored = message.clone();
            stored.id = Some(id);
            state.messages.push(stored);
            Ok(id)
        })
    }

    fn store_transaction<'a>(&'a self, record: &'a TransactionRecord) -> SinkFuture<'a, i64> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            let id = state.transactions.len() as i64 + 1;
            let mut stored = record.clone();
            stored.id = Some(id);
            state.transactions.push(stored);
            Ok(id)
        })
    }

    fn mark_parsed<'a>(&'a self, message_id: i64, transaction_id: i64) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            let message = state
                .messages
                .iter_mut()
                .find(|m| m.id == Some(message_id))
                .ok_or(SinkError::UnknownMessage(message_id))?;
            message.status = ParseStatus::Parsed;
            message.parse_error = None;
            message.transaction_id = Some(transaction_id);
            Ok(())
        })
    }

    fn mark_failed<'a>(&'a self, message_id: i64, reason: &'a str) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            let message = state
                .messages
                .iter_mut()
                .find(|m| m.id == Some(message_id))
                .ok_or(SinkError::UnknownMessage(message_id))?;
            message.status = ParseStatus::Failed;
            message.parse_error = Some(reason.to_string());
            Ok(())
        })
    }
}

// ── Sqlite sink ───────────────────────────────────────────────────────────────

/// Persistence over the workspace sqlite database.
pub struct SqliteSink {
    pool: DbPool,
}

impl SqliteSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PersistenceSink for SqliteSink {
    fn store_captured<'a>(&'a self, message: &'a CapturedMessage) -> SinkFuture<'a, i64> {
        Box::pin(async move {
            kharcha_storage::insert_captured(&self.pool, message)
                .await
                .map_err(|e| SinkError::Storage(e.to_string()))
        })
    }

    fn store_transaction<'a>(&'a self, record: &'a TransactionRecord) -> SinkFuture<'a, i64> {
        Box::pin(async move {
            kharcha_storage::insert_transaction(&self.pool, record)
                .await
                .map_err(|e| SinkError::Storage(e.to_string()))
        })
    }

    fn mark_parsed<'a>(&'a self, message_id: i64, transaction_id: i64) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            kharcha_storage::mark_captured_parsed(&self.pool, message_id, transaction_id)
                .await
                .map_err(|e| SinkError::Storage(e.to_string()))
        })
    }

    fn mark_failed<'a>(&'a self, message_id: i64, reason: &'a str) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            kharcha_storage::mark_captured_failed(&self.pool, message_id, reason)
                .await
                .map_err(|e| SinkError::Storage(e.to_string()))
        })
    }
}
