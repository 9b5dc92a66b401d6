//! Trade ledger
//!
//! SQLite-backed persistence for the open/closed lot groups the position
//! manager reasons about. WAL journal mode keeps concurrent dashboard
//! reads from blocking the trading loop's writes. Every mutation is a
//! single statement, so each call is atomic: a failed order can never
//! leave a half-written lot group behind.

use rusqlite::{params, Connection};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::Result;
use crate::types::{Side, TradeRecord, TradeStatus};

/// Handle to the trades table. Cheap to clone; all clones share one
/// connection behind a mutex.
#[derive(Clone)]
pub struct TradeLedger {
    conn: Arc<Mutex<Connection>>,
}

impl TradeLedger {
    /// Open (or create) the ledger at `db_path` and ensure the schema.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    /// In-memory ledger for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;

        // order_id is TEXT: Binance ids overflow a 53-bit-safe integer
        conn.execute(
            "CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                order_id TEXT NOT NULL,
                side TEXT NOT NULL,
                price REAL NOT NULL,
                amount REAL NOT NULL,
                strategy TEXT NOT NULL,
                status TEXT NOT NULL,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_trades_symbol_status ON trades(symbol, status)",
            [],
        )?;

        debug!("Trade ledger schema verified");
        Ok(TradeLedger {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Record a filled BUY as a new OPEN lot.
    pub fn insert_open(
        &self,
        symbol: &str,
        order_id: &str,
        price: f64,
        amount: f64,
        strategy: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO trades (symbol, order_id, side, price, amount, strategy, status)
             VALUES (?1, ?2, 'BUY', ?3, ?4, ?5, 'OPEN')",
            params![symbol, order_id, price, amount, strategy],
        )?;

        debug!(
            "Lot recorded: {} BUY {:.8} @ {:.8} [{}]",
            symbol, amount, price, strategy
        );
        Ok(())
    }

    /// Group-close: mark every OPEN lot for the symbol CLOSED. Returns the
    /// number of lots closed. There is no partial-lot close.
    pub fn close_all_open(&self, symbol: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let closed = conn.execute(
            "UPDATE trades SET status = 'CLOSED' WHERE symbol = ?1 AND status = 'OPEN'",
            params![symbol],
        )?;

        debug!("Closed {} open lots for {}", closed, symbol);
        Ok(closed)
    }

    /// All OPEN lots for a symbol, insertion order.
    pub fn open_trades(&self, symbol: &str) -> Result<Vec<TradeRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, symbol, order_id, side, price, amount, strategy, status, timestamp
             FROM trades WHERE symbol = ?1 AND status = 'OPEN' ORDER BY id",
        )?;

        let trades = stmt
            .query_map(params![symbol], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(trades)
    }

    /// Whether the symbol currently has any OPEN lot.
    pub fn has_open(&self, symbol: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM trades WHERE symbol = ?1 AND status = 'OPEN'",
            params![symbol],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Most recent `limit` records, newest first (dashboard history view).
    pub fn recent(&self, limit: u32) -> Result<Vec<TradeRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, symbol, order_id, side, price, amount, strategy, status, timestamp
             FROM trades ORDER BY id DESC LIMIT ?1",
        )?;

        let trades = stmt
            .query_map(params![limit], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(trades)
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> std::result::Result<TradeRecord, rusqlite::Error> {
        let side_str: String = row.get(3)?;
        let status_str: String = row.get(7)?;

        Ok(TradeRecord {
            id: row.get(0)?,
            symbol: row.get(1)?,
            order_id: row.get(2)?,
            side: Side::from_str(&side_str).unwrap_or(Side::Buy),
            price: row.get(4)?,
            amount: row.get(5)?,
            strategy: row.get(6)?,
            status: TradeStatus::from_str(&status_str).unwrap_or(TradeStatus::Closed),
            timestamp: row.get(8)?,
        })
    }
}
