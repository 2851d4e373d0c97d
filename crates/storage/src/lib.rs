pub mod db;

pub use db::{
    create_db, get_captured, get_transaction, insert_captured, insert_transaction,
    list_recent_captured, list_recent_transactions, mark_captured_failed, mark_captured_parsed,
    DbPool,
};
