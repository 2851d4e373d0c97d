use std::path::Path;
use std::str::FromStr;

use kharcha_core::{CapturedMessage, ParseStatus, TransactionRecord};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

async fn create_schema(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            amount TEXT NOT NULL,
            currency TEXT NOT NULL,
            merchant TEXT NOT NULL,
            account_ref TEXT NOT NULL DEFAULT '',
            reference TEXT NOT NULL DEFAULT '',
            timestamp_ms INTEGER NOT NULL,
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            bank_name TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT '',
            raw_text TEXT NOT NULL,
            is_expense INTEGER NOT NULL DEFAULT 1,
            notes TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS captured_messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sender TEXT NOT NULL,
            body TEXT NOT NULL,
            timestamp_ms INTEGER NOT NULL,
            from_bank INTEGER NOT NULL DEFAULT 0,
            bank_name TEXT,
            status TEXT NOT NULL,
            parse_error TEXT,
            transaction_id INTEGER,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (transaction_id) REFERENCES transactions(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

// ── Transactions ──────────────────────────────────────────────────────────────

pub async fn insert_transaction(
    pool: &DbPool,
    record: &TransactionRecord,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO transactions
            (amount, currency, merchant, account_ref, reference, timestamp_ms,
             date, time, bank_name, category, raw_text, is_expense, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.amount.to_string())
    .bind(&record.currency)
    .bind(&record.merchant)
    .bind(&record.account)
    .bind(&record.reference)
    .bind(record.timestamp_ms)
    .bind(&record.date)
    .bind(&record.time)
    .bind(&record.bank_name)
    .bind(&record.category)
    .bind(&record.raw_text)
    .bind(record.is_expense as i64)
    .bind(&record.notes)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

type TransactionRow = (
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
);

fn record_from_row(row: TransactionRow) -> Result<TransactionRecord, sqlx::Error> {
    let amount = Decimal::from_str(&row.1).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    Ok(TransactionRecord {
        id: Some(row.0),
        amount,
        currency: row.2,
        merchant: row.3,
        account: row.4,
        reference: row.5,
        timestamp_ms: row.6,
        date: row.7,
        time: row.8,
        bank_name: row.9,
        category: row.10,
        raw_text: row.11,
        is_expense: row.12 != 0,
        notes: row.13,
    })
}

const TRANSACTION_COLUMNS: &str = "id, amount, currency, merchant, account_ref, reference, \
     timestamp_ms, date, time, bank_name, category, raw_text, is_expense, notes";

pub async fn get_transaction(
    pool: &DbPool,
    id: i64,
) -> Result<Option<TransactionRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(record_from_row).transpose()
}

/// Most recent first, by message timestamp.
pub async fn list_recent_transactions(
    pool: &DbPool,
    limit: i64,
) -> Result<Vec<TransactionRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY timestamp_ms DESC LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(record_from_row).collect()
}

// ── Captured messages ─────────────────────────────────────────────────────────

pub async fn insert_captured(
    pool: &DbPool,
    message: &CapturedMessage,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO captured_messages
            (sender, body, timestamp_ms, from_bank, bank_name, status, parse_error, transaction_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&message.sender)
    .bind(&message.body)
    .bind(message.received_at_ms)
    .bind(message.from_bank as i64)
    .bind(&message.bank_name)
    .bind(message.status.to_string())
    .bind(&message.parse_error)
    .bind(message.transaction_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

type CapturedRow = (
    i64,
    String,
    String,
    i64,
    i64,
    Option<String>,
    String,
    Option<String>,
    Option<i64>,
);

fn captured_from_row(row: CapturedRow) -> Result<CapturedMessage, sqlx::Error> {
    let status =
        ParseStatus::from_str(&row.6).map_err(|e| sqlx::Error::Decode(e.into()))?;
    Ok(CapturedMessage {
        id: Some(row.0),
        sender: row.1,
        body: row.2,
        received_at_ms: row.3,
        from_bank: row.4 != 0,
        bank_name: row.5,
        status,
        parse_error: row.7,
        transaction_id: row.8,
    })
}

const CAPTURED_COLUMNS: &str =
    "id, sender, body, timestamp_ms, from_bank, bank_name, status, parse_error, transaction_id";

pub async fn get_captured(
    pool: &DbPool,
    id: i64,
) -> Result<Option<CapturedMessage>, sqlx::Error> {
    let row = sqlx::query_as::<_, CapturedRow>(&format!(
        "SELECT {CAPTURED_COLUMNS} FROM captured_messages WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(captured_from_row).transpose()
}

pub async fn list_recent_captured(
    pool: &DbPool,
    limit: i64,
) -> Result<Vec<CapturedMessage>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CapturedRow>(&format!(
        "SELECT {CAPTURED_COLUMNS} FROM captured_messages ORDER BY timestamp_ms DESC LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(captured_from_row).collect()
}

pub async fn mark_captured_parsed(
    pool: &DbPool,
    id: i64,
    transaction_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE captured_messages SET status = ?, parse_error = NULL, transaction_id = ? WHERE id = ?",
    )
    .bind(ParseStatus::Parsed.to_string())
    .bind(transaction_id)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_captured_failed(
    pool: &DbPool,
    id: i64,
    reason: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE captured_messages SET status = ?, parse_error = ? WHERE id = ?")
        .bind(ParseStatus::Failed.to_string())
        .bind(reason)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
