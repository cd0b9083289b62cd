use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::models::Transaction;

/// One CSV line. Column names match what the legacy importer reads, so an
/// export can be loaded back into a fresh database.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: Option<i64>,
    created_at: String,
    #[serde(rename = "type")]
    tx_type: &'static str,
    kind: &'static str,
    wallet: &'static str,
    amount: Decimal,
    cost_total: Option<Decimal>,
    source: &'a str,
    description: &'a str,
    method: Option<&'a str>,
    is_internal: bool,
    user_id: Option<&'a str>,
}

impl<'a> From<&'a Transaction> for ExportRow<'a> {
    fn from(txn: &'a Transaction) -> Self {
        Self {
            id: txn.id,
            created_at: txn.timestamp(),
            tx_type: txn.tx_type.as_str(),
            kind: txn.kind.as_str(),
            wallet: txn.wallet.map(|w| w.as_str()).unwrap_or(""),
            amount: txn.amount,
            cost_total: txn.cost_total,
            source: &txn.source,
            description: &txn.description,
            method: txn.method.as_deref(),
            is_internal: txn.is_internal,
            user_id: txn.user_id.as_deref(),
        }
    }
}

pub(crate) fn write_csv(writer: impl Write, transactions: &[Transaction]) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    for txn in transactions {
        wtr.serialize(ExportRow::from(txn))
            .context("Failed to write CSV record")?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(transactions.len())
}

pub(crate) fn export_to_path(path: &Path, transactions: &[Transaction]) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create export file: {}", path.display()))?;
    let count = write_csv(file, transactions)?;
    tracing::info!(count, path = %path.display(), "transactions exported");
    Ok(count)
}

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;
