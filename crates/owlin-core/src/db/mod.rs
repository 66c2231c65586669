//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `documents` - Invoice and delivery-note storage
//! - `matching` - Candidate ranking, confirm/reject, auto-pairing, pair history

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{info, warn};

use crate::error::Result;

mod documents;
mod matching;


pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
///
/// Unreadable values are logged and come back as the Unix epoch, never as the
/// current time.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return dt.and_utc();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    warn!("Unreadable timestamp in database: {:?}", s);
    DateTime::<Utc>::default()
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) the database at `path` and run migrations
    pub fn new(path: &str) -> Result<Self> {
        // Foreign keys are per-connection in SQLite, so every pooled connection enables them
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self { pool };
        db.run_migrations()?;
        info!("Database ready at {}", path);
        Ok(db)
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because every pooled
    /// connection to `:memory:` would see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "owlin_test_{}_{}.db",
            std::process::id(),
            id
        ));

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path.to_string_lossy())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Invoices as extracted from uploaded documents
            CREATE TABLE IF NOT EXISTS invoices (
                id TEXT PRIMARY KEY,
                supplier_name TEXT,
                invoice_date TEXT,
                total_amount REAL,
                line_items TEXT NOT NULL DEFAULT '[]',  -- JSON array of line items
                status TEXT NOT NULL DEFAULT 'scanned', -- scanned, matched
                content_hash TEXT UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_invoices_status ON invoices(status);

            -- Delivery notes as extracted from uploaded documents
            CREATE TABLE IF NOT EXISTS delivery_notes (
                id TEXT PRIMARY KEY,
                supplier_name TEXT,
                delivery_date TEXT,
                total_amount REAL,
                line_items TEXT NOT NULL DEFAULT '[]',
                status TEXT NOT NULL DEFAULT 'parsed',  -- parsed, matched
                content_hash TEXT UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_delivery_notes_status ON delivery_notes(status);
            CREATE INDEX IF NOT EXISTS idx_delivery_notes_date ON delivery_notes(delivery_date);

            -- Invoice/delivery-note pairings (never deleted)
            CREATE TABLE IF NOT EXISTS invoice_delivery_pairs (
                id INTEGER PRIMARY KEY,
                invoice_id TEXT NOT NULL REFERENCES invoices(id),
                delivery_note_id TEXT NOT NULL REFERENCES delivery_notes(id),
                confidence_score REAL NOT NULL,
                breakdown_supplier REAL NOT NULL,
                breakdown_date REAL NOT NULL,
                breakdown_line_items REAL NOT NULL,
                breakdown_value REAL NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending', -- pending, confirmed, rejected
                confirmed_by TEXT,
                confirmed_at DATETIME,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(invoice_id, delivery_note_id)
            );

            CREATE INDEX IF NOT EXISTS idx_pairs_status ON invoice_delivery_pairs(status);

            -- Append-only log of pairing decisions
            CREATE TABLE IF NOT EXISTS matching_history (
                id INTEGER PRIMARY KEY,
                invoice_id TEXT NOT NULL REFERENCES invoices(id),
                delivery_note_id TEXT NOT NULL REFERENCES delivery_notes(id),
                action TEXT NOT NULL,
                confidence_score REAL NOT NULL,
                breakdown_supplier REAL NOT NULL,
                breakdown_date REAL NOT NULL,
                breakdown_line_items REAL NOT NULL,
                breakdown_value REAL NOT NULL,
                actor_role TEXT,
                notes TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_history_invoice ON matching_history(invoice_id);
            "#,
        )?;

        Ok(())
    }
}
