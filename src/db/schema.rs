pub(crate) const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    tx_type      TEXT NOT NULL,
    kind         TEXT NOT NULL,
    amount       TEXT NOT NULL,
    cost_total   TEXT,
    wallet       TEXT NOT NULL,
    source       TEXT NOT NULL DEFAULT '',
    description  TEXT NOT NULL DEFAULT '',
    method       TEXT,
    is_internal  BOOLEAN NOT NULL DEFAULT 0,
    user_id      TEXT,
    created_at   TEXT NOT NULL,
    import_hash  TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_transactions_created ON transactions(created_at);
CREATE INDEX IF NOT EXISTS idx_transactions_wallet ON transactions(wallet);
CREATE INDEX IF NOT EXISTS idx_transactions_kind ON transactions(kind);
CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_hash_unique ON transactions(import_hash) WHERE import_hash != '';

CREATE TABLE IF NOT EXISTS wallet_balances (
    wallet   TEXT PRIMARY KEY,
    balance  TEXT NOT NULL DEFAULT '0'
);

"#;

pub(crate) const CURRENT_VERSION: i32 = 1;

/// Migrations from version N to N+1.
/// Each entry is (from_version, sql).
pub(crate) const MIGRATIONS: &[(i32, &str)] = &[
    // Future migrations go here:
    // (1, "ALTER TABLE transactions ADD COLUMN ticket_no TEXT NOT NULL DEFAULT '';"),
];
