mod schema;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use crate::models::*;

const SELECT_COLUMNS: &str = "id, tx_type, kind, amount, cost_total, wallet, source, description, \
     method, is_internal, user_id, created_at, import_hash";

/// Row filter for transaction reads. Bounds are `[from, to)`.
#[derive(Debug, Clone, Default)]
pub(crate) struct TxFilter {
    pub(crate) from: Option<NaiveDateTime>,
    pub(crate) to: Option<NaiveDateTime>,
    pub(crate) wallet: Option<WalletId>,
    pub(crate) kinds: Vec<TxKind>,
    pub(crate) search: Option<String>,
    pub(crate) limit: Option<u32>,
    pub(crate) newest_first: bool,
}

impl TxFilter {
    pub(crate) fn all() -> Self {
        Self::default()
    }

    /// Every row stamped on the given calendar day.
    pub(crate) fn day(day: NaiveDate) -> Self {
        Self::range(day, day)
    }

    /// Inclusive range of calendar days.
    pub(crate) fn range(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            from: Some(first.and_time(chrono::NaiveTime::MIN)),
            to: last.succ_opt().map(|d| d.and_time(chrono::NaiveTime::MIN)),
            ..Self::default()
        }
    }

    pub(crate) fn with_wallet(mut self, wallet: WalletId) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub(crate) fn with_kinds(mut self, kinds: &[TxKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }
}

pub(crate) struct Database {
    conn: Connection,
}

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
            .context("Failed to set database pragmas")?;
        let mut db = Self { conn };
        db.migrate().context("Database migration failed")?;
        db.seed_wallet_balances()?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self { conn };
        db.migrate()?;
        db.seed_wallet_balances()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<()> {
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !has_version_table {
            self.conn.execute_batch(schema::SCHEMA_V1)?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            return Ok(());
        }

        let current: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?
            .unwrap_or(0);

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                tracing::info!(from_version, "applying schema migration");
                self.conn.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
        }

        Ok(())
    }

    fn seed_wallet_balances(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for wallet in WalletId::all() {
            tx.execute(
                "INSERT OR IGNORE INTO wallet_balances (wallet, balance) VALUES (?1, '0')",
                params![wallet.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Run `f` inside one `BEGIN IMMEDIATE` transaction. The write lock is
    /// taken up front, so balances read inside `f` cannot go stale before the
    /// rows that depend on them are written. Any error rolls everything back.
    pub(crate) fn with_tx<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&LedgerTx<'_>) -> std::result::Result<T, E>,
        E: From<anyhow::Error>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to begin transaction")
            .map_err(E::from)?;
        let ledger_tx = LedgerTx { tx };
        let out = f(&ledger_tx)?;
        ledger_tx
            .tx
            .commit()
            .context("Failed to commit transaction")
            .map_err(E::from)?;
        Ok(out)
    }

    // ── Transactions ──────────────────────────────────────────

    pub(crate) fn get_transactions(&self, filter: &TxFilter) -> Result<Vec<Transaction>> {
        query_transactions(&self.conn, filter)
    }

    #[cfg(test)]
    pub(crate) fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        get_transaction(&self.conn, id)
    }

    pub(crate) fn get_transaction_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?)
    }

    /// Insert rows from a legacy export. Rows whose `import_hash` is already
    /// present are skipped. Every row must already carry a wallet.
    pub(crate) fn insert_imported_batch(&mut self, txns: &[Transaction]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut count = 0;
        for txn in txns {
            if !txn.import_hash.is_empty() {
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM transactions WHERE import_hash = ?1 AND import_hash != '')",
                    params![txn.import_hash],
                    |row| row.get(0),
                )?;
                if exists {
                    continue;
                }
            }
            insert_row(&tx, txn)?;
            count += 1;
        }
        tx.commit()?;
        tracing::info!(imported = count, skipped = txns.len() - count, "legacy rows imported");
        Ok(count)
    }

    // ── Balance snapshot ──────────────────────────────────────

    pub(crate) fn get_balances(&self) -> Result<BTreeMap<WalletId, Decimal>> {
        snapshot_balances(&self.conn)
    }

    /// Overwrite the snapshot, e.g. with the result of a full refold.
    pub(crate) fn replace_balances(&mut self, balances: &BTreeMap<WalletId, Decimal>) -> Result<()> {
        let tx = self.conn.transaction()?;
        for wallet in WalletId::all() {
            let balance = balances.get(wallet).copied().unwrap_or_default();
            write_balance(&tx, *wallet, balance)?;
        }
        tx.commit()?;
        tracing::warn!("wallet balance snapshot rebuilt from history");
        Ok(())
    }
}

/// Handle for reads and writes inside [`Database::with_tx`]. Every write keeps
/// `wallet_balances` in step with the rows.
pub(crate) struct LedgerTx<'conn> {
    tx: rusqlite::Transaction<'conn>,
}

impl LedgerTx<'_> {
    pub(crate) fn balance(&self, wallet: WalletId) -> Result<Decimal> {
        read_balance(&self.tx, wallet)
    }

    pub(crate) fn transactions(&self, filter: &TxFilter) -> Result<Vec<Transaction>> {
        query_transactions(&self.tx, filter)
    }

    pub(crate) fn get(&self, id: i64) -> Result<Option<Transaction>> {
        get_transaction(&self.tx, id)
    }

    pub(crate) fn insert(&self, txn: &Transaction) -> Result<i64> {
        insert_row(&self.tx, txn)
    }

    /// Replace the mutable fields of row `id`. The old effect on the balance
    /// snapshot is reverted and the new one applied.
    pub(crate) fn update(&self, id: i64, txn: &Transaction) -> Result<()> {
        let old = get_transaction(&self.tx, id)?
            .ok_or_else(|| anyhow::anyhow!("Transaction {id} not found"))?;
        let wallet = require_wallet(txn)?;
        self.tx.execute(
            "UPDATE transactions SET tx_type = ?1, kind = ?2, amount = ?3, cost_total = ?4,
                    wallet = ?5, source = ?6, description = ?7, method = ?8, is_internal = ?9,
                    user_id = ?10, created_at = ?11
             WHERE id = ?12",
            params![
                txn.tx_type.as_str(),
                txn.kind.as_str(),
                txn.amount.to_string(),
                txn.cost_total.map(|c| c.to_string()),
                wallet.as_str(),
                txn.source,
                txn.description,
                txn.method,
                txn.is_internal,
                txn.user_id,
                txn.timestamp(),
                id,
            ],
        )?;
        apply_delta(&self.tx, require_wallet(&old)?, -old.signed_amount())?;
        apply_delta(&self.tx, wallet, txn.signed_amount())?;
        tracing::debug!(id, "transaction updated");
        Ok(())
    }

    /// Hard delete. Returns the removed row, if it existed.
    pub(crate) fn delete(&self, id: i64) -> Result<Option<Transaction>> {
        let Some(old) = get_transaction(&self.tx, id)? else {
            return Ok(None);
        };
        self.tx
            .execute("DELETE FROM transactions WHERE id = ?1", params![id])?;
        apply_delta(&self.tx, require_wallet(&old)?, -old.signed_amount())?;
        tracing::debug!(id, "transaction deleted");
        Ok(Some(old))
    }
}

// ── Shared statements ─────────────────────────────────────────

fn require_wallet(txn: &Transaction) -> Result<WalletId> {
    txn.wallet
        .ok_or_else(|| anyhow::anyhow!("Refusing to store a transaction without a wallet"))
}

fn insert_row(conn: &Connection, txn: &Transaction) -> Result<i64> {
    let wallet = require_wallet(txn)?;
    conn.execute(
        "INSERT INTO transactions (tx_type, kind, amount, cost_total, wallet, source, description,
                                   method, is_internal, user_id, created_at, import_hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            txn.tx_type.as_str(),
            txn.kind.as_str(),
            txn.amount.to_string(),
            txn.cost_total.map(|c| c.to_string()),
            wallet.as_str(),
            txn.source,
            txn.description,
            txn.method,
            txn.is_internal,
            txn.user_id,
            txn.timestamp(),
            txn.import_hash,
        ],
    )?;
    let id = conn.last_insert_rowid();
    apply_delta(conn, wallet, txn.signed_amount())?;
    tracing::debug!(id, %wallet, kind = %txn.kind, amount = %txn.amount, "transaction inserted");
    Ok(id)
}

fn get_transaction(conn: &Connection, id: i64) -> Result<Option<Transaction>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM transactions WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], map_row).optional()?)
}

fn query_transactions(conn: &Connection, filter: &TxFilter) -> Result<Vec<Transaction>> {
    let mut sql = format!("SELECT {SELECT_COLUMNS} FROM transactions WHERE 1=1");
    let mut param_values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(from) = filter.from {
        sql.push_str(&format!(" AND created_at >= ?{}", param_values.len() + 1));
        param_values.push(Box::new(from.format(TIMESTAMP_FORMAT).to_string()));
    }
    if let Some(to) = filter.to {
        sql.push_str(&format!(" AND created_at < ?{}", param_values.len() + 1));
        param_values.push(Box::new(to.format(TIMESTAMP_FORMAT).to_string()));
    }
    if let Some(wallet) = filter.wallet {
        sql.push_str(&format!(" AND wallet = ?{}", param_values.len() + 1));
        param_values.push(Box::new(wallet.as_str()));
    }
    if !filter.kinds.is_empty() {
        let placeholders: Vec<String> = filter
            .kinds
            .iter()
            .enumerate()
            .map(|(i, _)| format!("?{}", param_values.len() + i + 1))
            .collect();
        sql.push_str(&format!(" AND kind IN ({})", placeholders.join(",")));
        for kind in &filter.kinds {
            param_values.push(Box::new(kind.as_str()));
        }
    }
    if let Some(s) = &filter.search {
        sql.push_str(&format!(
            " AND (source LIKE ?{0} OR description LIKE ?{0})",
            param_values.len() + 1
        ));
        param_values.push(Box::new(format!("%{s}%")));
    }

    if filter.newest_first {
        sql.push_str(" ORDER BY created_at DESC, id DESC");
    } else {
        sql.push_str(" ORDER BY created_at ASC, id ASC");
    }
    if let Some(l) = filter.limit {
        sql.push_str(&format!(" LIMIT {l}"));
    }

    let params_ref: Vec<&dyn ToSql> = param_values.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_ref.as_slice(), map_row)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

fn snapshot_balances(conn: &Connection) -> Result<BTreeMap<WalletId, Decimal>> {
    let mut balances: BTreeMap<WalletId, Decimal> =
        WalletId::all().iter().map(|w| (*w, Decimal::ZERO)).collect();
    let mut stmt = conn.prepare("SELECT wallet, balance FROM wallet_balances")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            parse_col(row, 0, WalletId::parse)?,
            decimal_col(row, 1)?,
        ))
    })?;
    for row in rows {
        let (wallet, balance) = row?;
        balances.insert(wallet, balance);
    }
    Ok(balances)
}

fn read_balance(conn: &Connection, wallet: WalletId) -> Result<Decimal> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT balance FROM wallet_balances WHERE wallet = ?1",
            params![wallet.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Decimal::from_str(&s)
            .with_context(|| format!("Corrupt balance for {wallet}: '{s}'")),
        None => Ok(Decimal::ZERO),
    }
}

fn write_balance(conn: &Connection, wallet: WalletId, balance: Decimal) -> Result<()> {
    conn.execute(
        "INSERT INTO wallet_balances (wallet, balance) VALUES (?1, ?2)
         ON CONFLICT(wallet) DO UPDATE SET balance = ?2",
        params![wallet.as_str(), balance.to_string()],
    )?;
    Ok(())
}

fn apply_delta(conn: &Connection, wallet: WalletId, delta: Decimal) -> Result<()> {
    if delta.is_zero() {
        return Ok(());
    }
    let balance = read_balance(conn, wallet)? + delta;
    write_balance(conn, wallet, balance)
}

// ── Row mapping ───────────────────────────────────────────────

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: Some(row.get(0)?),
        tx_type: parse_col(row, 1, TxType::parse)?,
        kind: parse_col(row, 2, TxKind::parse)?,
        amount: decimal_col(row, 3)?,
        cost_total: match row.get::<_, Option<String>>(4)? {
            Some(_) => Some(decimal_col(row, 4)?),
            None => None,
        },
        wallet: Some(parse_col(row, 5, WalletId::parse)?),
        source: row.get(6)?,
        description: row.get(7)?,
        method: row.get(8)?,
        is_internal: row.get(9)?,
        user_id: row.get(10)?,
        created_at: timestamp_col(row, 11)?,
        import_hash: row.get(12)?,
    })
}

fn conversion_error(idx: usize, err: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn parse_col<T>(row: &rusqlite::Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, anyhow::anyhow!("unrecognized value '{raw}'")))
}

fn decimal_col(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, e.into()))
}

fn timestamp_col(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(|e| conversion_error(idx, e.into()))
}

#[cfg(test)]
mod tests;
