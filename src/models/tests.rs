#![allow(clippy::unwrap_used)]

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::*;

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn make_txn(tx_type: TxType, kind: TxKind, amount: Decimal) -> Transaction {
    Transaction::new(tx_type, kind, WalletId::Cash, amount, at(10, 0))
}

// ── Transaction ───────────────────────────────────────────────

#[test]
fn test_signed_amount_revenue() {
    let txn = make_txn(TxType::Revenue, TxKind::Sale, dec!(12.50));
    assert_eq!(txn.signed_amount(), dec!(12.50));
}

#[test]
fn test_signed_amount_expense() {
    let txn = make_txn(TxType::Expense, TxKind::Expense, dec!(7.25));
    assert_eq!(txn.signed_amount(), dec!(-7.25));
}

#[test]
fn test_signed_amount_closure_is_zero() {
    let txn = make_txn(TxType::Closure, TxKind::Closure, dec!(300));
    assert_eq!(txn.signed_amount(), Decimal::ZERO);
}

#[test]
fn test_new_sets_internal_from_kind() {
    assert!(!make_txn(TxType::Revenue, TxKind::Sale, dec!(1)).is_internal);
    assert!(!make_txn(TxType::Expense, TxKind::Expense, dec!(1)).is_internal);
    assert!(make_txn(TxType::Revenue, TxKind::Transfer, dec!(1)).is_internal);
    assert!(make_txn(TxType::Revenue, TxKind::OpeningFund, dec!(1)).is_internal);
    assert!(make_txn(TxType::Closure, TxKind::Closure, dec!(1)).is_internal);
    assert!(make_txn(TxType::Expense, TxKind::Adjustment, dec!(1)).is_internal);
}

#[test]
fn test_new_defaults() {
    let txn = make_txn(TxType::Revenue, TxKind::Sale, dec!(10));
    assert!(txn.id.is_none());
    assert_eq!(txn.wallet, Some(WalletId::Cash));
    assert_eq!(txn.source, "Sale");
    assert!(txn.description.is_empty());
    assert!(txn.cost_total.is_none());
    assert!(txn.import_hash.is_empty());
}

#[test]
fn test_margin_for_sale() {
    let txn = make_txn(TxType::Revenue, TxKind::Sale, dec!(45)).with_cost_total(dec!(30));
    assert_eq!(txn.margin(), dec!(15));
}

#[test]
fn test_margin_ignores_internal_rows() {
    let txn = make_txn(TxType::Revenue, TxKind::OpeningFund, dec!(50)).with_cost_total(dec!(50));
    assert_eq!(txn.margin(), Decimal::ZERO);
}

#[test]
fn test_timestamp_format_sorts() {
    let early = make_txn(TxType::Revenue, TxKind::Sale, dec!(1));
    let mut late = early.clone();
    late.created_at = at(23, 1);
    assert_eq!(early.timestamp(), "2024-03-15 10:00:00");
    assert!(early.timestamp() < late.timestamp());
}

// ── TxType / TxKind ───────────────────────────────────────────

#[test]
fn test_tx_type_parse_legacy_labels() {
    assert_eq!(TxType::parse("Revenu"), Some(TxType::Revenue));
    assert_eq!(TxType::parse("Dépense"), Some(TxType::Expense));
    assert_eq!(TxType::parse("Cloture"), Some(TxType::Closure));
    assert_eq!(TxType::parse("EXPENSE"), Some(TxType::Expense));
    assert_eq!(TxType::parse("refund"), None);
}

#[test]
fn test_tx_kind_roundtrip() {
    for kind in [
        TxKind::Sale,
        TxKind::Expense,
        TxKind::Transfer,
        TxKind::OpeningFund,
        TxKind::Closure,
        TxKind::Adjustment,
    ] {
        assert_eq!(TxKind::parse(kind.as_str()), Some(kind));
    }
}

// ── WalletId ──────────────────────────────────────────────────

#[test]
fn test_wallet_parse() {
    assert_eq!(WalletId::parse("cash"), Some(WalletId::Cash));
    assert_eq!(WalletId::parse("Bank"), Some(WalletId::Bank));
    assert_eq!(WalletId::parse("safe"), Some(WalletId::Safe));
    assert_eq!(WalletId::parse("postal-card"), Some(WalletId::PostalCard));
    assert_eq!(WalletId::parse("banker_card"), Some(WalletId::BankerCard));
    assert_eq!(WalletId::parse("wallet"), None);
}

#[test]
fn test_wallet_parse_legacy_labels() {
    assert_eq!(WalletId::parse("Caisse"), Some(WalletId::Cash));
    assert_eq!(WalletId::parse("Banque"), Some(WalletId::Bank));
    assert_eq!(WalletId::parse("Coffre"), Some(WalletId::Safe));
    assert_eq!(WalletId::parse("Carte Postal"), Some(WalletId::PostalCard));
    assert_eq!(WalletId::parse("Carte Banker"), Some(WalletId::BankerCard));
}

#[test]
fn test_wallet_roundtrip() {
    for w in WalletId::all() {
        assert_eq!(WalletId::parse(w.as_str()), Some(*w), "Roundtrip failed for {w}");
    }
}

#[test]
fn test_wallet_all() {
    assert_eq!(WalletId::all().len(), 5);
}

// ── Alert ─────────────────────────────────────────────────────

#[test]
fn test_severity_ordering() {
    assert!(Severity::Critical > Severity::Error);
    assert!(Severity::Error > Severity::Warning);
    assert!(Severity::Warning > Severity::Info);
}

#[test]
fn test_auto_executable_requires_critical_transfer() {
    let transfer = SuggestedAction::Transfer {
        from: WalletId::Cash,
        to: WalletId::Safe,
        amount: dec!(600),
    };
    let critical = Alert::new(Severity::Critical, AlertCode::SecurityRisk, "risk")
        .suggest(transfer.clone());
    assert!(critical.is_auto_executable());

    let warning = Alert::new(Severity::Warning, AlertCode::CashAboveThreshold, "high")
        .suggest(transfer);
    assert!(!warning.is_auto_executable());

    let no_action = Alert::new(Severity::Critical, AlertCode::SecurityRisk, "risk");
    assert!(!no_action.is_auto_executable());
}
