use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::classify::Classifier;
use crate::models::{Transaction, TxKind, TxType, WalletId};

/// Column positions found in the header row of a hosted-store export.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LegacyColumns {
    /// Row id in the source store; part of the dedupe key when present.
    pub(crate) id: Option<usize>,
    pub(crate) tx_type: usize,
    pub(crate) amount: usize,
    pub(crate) created_at: usize,
    pub(crate) kind: Option<usize>,
    pub(crate) cost_total: Option<usize>,
    pub(crate) wallet: Option<usize>,
    pub(crate) source: Option<usize>,
    pub(crate) description: Option<usize>,
    pub(crate) method: Option<usize>,
    pub(crate) is_internal: Option<usize>,
    pub(crate) user_id: Option<usize>,
}

impl LegacyColumns {
    pub(crate) fn from_headers(headers: &[String]) -> Result<Self> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();
        let find = |aliases: &[&str]| names.iter().position(|n| aliases.contains(&n.as_str()));
        let require = |aliases: &[&str]| {
            find(aliases).with_context(|| format!("Missing required column '{}'", aliases[0]))
        };

        Ok(Self {
            id: find(&["id"]),
            tx_type: require(&["type", "tx_type"])?,
            amount: require(&["amount", "montant"])?,
            created_at: require(&["created_at", "date"])?,
            kind: find(&["kind"]),
            cost_total: find(&["cost_total", "cout_total", "coût_total"]),
            wallet: find(&["wallet", "portefeuille"]),
            source: find(&["source"]),
            description: find(&["description"]),
            method: find(&["method", "methode", "méthode"]),
            is_internal: find(&["is_internal"]),
            user_id: find(&["user_id"]),
        })
    }
}

#[derive(Debug, Default)]
pub(crate) struct LegacyBatch {
    pub(crate) transactions: Vec<Transaction>,
    /// Rows whose wallet came from the keyword heuristic.
    pub(crate) tagged: usize,
}

pub(crate) fn load_legacy(path: &Path, classifier: &Classifier) -> Result<LegacyBatch> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
    parse_legacy(file, classifier)
}

/// Parse an export, infer kinds, and stamp a wallet on every row.
pub(crate) fn parse_legacy(reader: impl Read, classifier: &Classifier) -> Result<LegacyBatch> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(reader);

    let mut records = rdr.records();
    let headers: Vec<String> = match records.next() {
        Some(record) => record
            .context("Failed to read CSV header")?
            .iter()
            .map(str::to_string)
            .collect(),
        None => anyhow::bail!("CSV file is empty"),
    };
    let columns = LegacyColumns::from_headers(&headers)?;

    let mut transactions = Vec::new();
    for (i, record) in records.enumerate() {
        let line = i + 2;
        let record = record.with_context(|| format!("Line {line}: failed to read CSV record"))?;
        let row: Vec<String> = record.iter().map(|s| s.trim().to_string()).collect();
        if row.iter().all(String::is_empty) {
            continue;
        }
        let txn = parse_row(&row, &columns, classifier).with_context(|| format!("Line {line}"))?;
        transactions.push(txn);
    }

    let tagged = classifier.tag_batch(&mut transactions);
    tracing::info!(rows = transactions.len(), tagged, "legacy export parsed");
    Ok(LegacyBatch {
        transactions,
        tagged,
    })
}

fn cell<'r>(row: &'r [String], col: Option<usize>) -> &'r str {
    col.and_then(|c| row.get(c)).map(String::as_str).unwrap_or("")
}

fn parse_row(row: &[String], columns: &LegacyColumns, classifier: &Classifier) -> Result<Transaction> {
    let raw_type = cell(row, Some(columns.tx_type));
    let tx_type =
        TxType::parse(raw_type).with_context(|| format!("unknown transaction type '{raw_type}'"))?;

    let raw_amount = cell(row, Some(columns.amount));
    let mut amount = parse_decimal(raw_amount)?;
    if amount < Decimal::ZERO {
        tracing::warn!(raw_amount, "negative legacy amount stored as its absolute value");
        amount = amount.abs();
    }
    let cost_total = match cell(row, columns.cost_total) {
        "" => None,
        raw => Some(parse_decimal(raw)?),
    };

    let raw_created = cell(row, Some(columns.created_at));
    let created_at = parse_timestamp(raw_created)?;

    let source = cell(row, columns.source).to_string();
    let description = cell(row, columns.description).to_string();
    let method = Some(cell(row, columns.method))
        .filter(|m| !m.is_empty())
        .map(str::to_string);
    let flagged_internal = parse_bool(cell(row, columns.is_internal));
    let raw_wallet = cell(row, columns.wallet);
    let wallet = WalletId::parse(raw_wallet);
    if wallet.is_none() && !raw_wallet.is_empty() {
        tracing::debug!(raw_wallet, "unknown wallet label, falling back to heuristics");
    }

    let kind = TxKind::parse(cell(row, columns.kind))
        .unwrap_or_else(|| classifier.infer_kind(tx_type, flagged_internal, &source, &description));

    let amount_text = amount.to_string();
    let mut key: Vec<&str> = vec![
        raw_created,
        raw_type,
        amount_text.as_str(),
        raw_wallet,
        source.as_str(),
        description.as_str(),
    ];
    let raw_id = cell(row, columns.id);
    if !raw_id.is_empty() {
        key.push(raw_id);
    }
    let import_hash = compute_hash(&key);

    Ok(Transaction {
        id: None,
        tx_type,
        kind,
        amount,
        cost_total,
        wallet,
        source,
        description,
        method,
        is_internal: flagged_internal || kind.is_internal(),
        user_id: Some(cell(row, columns.user_id))
            .filter(|u| !u.is_empty())
            .map(str::to_string),
        created_at,
        import_hash,
    })
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "t" | "1" | "yes" | "oui")
}

/// Amounts as the hosted store printed them: optional "DT" suffix, spaces as
/// thousands separators, and a decimal comma when no point is present.
pub(crate) fn parse_decimal(s: &str) -> Result<Decimal> {
    let mut cleaned: String = s
        .trim()
        .trim_end_matches("DT")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '"')
        .collect();
    if cleaned.contains(',') {
        cleaned = if cleaned.contains('.') {
            cleaned.replace(',', "")
        } else {
            cleaned.replace(',', ".")
        };
    }
    if cleaned.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(&cleaned).with_context(|| format!("Failed to parse '{s}' as decimal"))
}

/// RFC 3339 timestamps are converted to local time; naive ones are taken as
/// shop-local already. Sub-second precision is dropped.
pub(crate) fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let zoned = DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z"));
    if let Ok(dt) = zoned {
        return Ok(truncate(dt.with_timezone(&Local).naive_local()));
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(truncate(dt));
        }
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d.and_time(chrono::NaiveTime::MIN));
        }
    }
    anyhow::bail!("Could not parse timestamp: {s}")
}

fn truncate(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// FNV-1a over the identifying fields. Stable across Rust releases, unlike
/// `DefaultHasher`.
fn compute_hash(fields: &[&str]) -> String {
    let hash = fnv1a(fields.join("|").as_bytes());
    format!("{hash:016x}")
}

fn fnv1a(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
#[path = "legacy_tests.rs"]
mod tests;
