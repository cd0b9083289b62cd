#![allow(clippy::unwrap_used)]

use super::*;
use chrono::NaiveDateTime;
use rust_decimal_macros::dec;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

fn at(d: u32, hour: u32) -> NaiveDateTime {
    day(d).and_hms_opt(hour, 0, 0).unwrap()
}

fn row(id: i64, tx_type: TxType, kind: TxKind, wallet: WalletId, amount: Decimal, when: NaiveDateTime) -> Transaction {
    let mut txn = Transaction::new(tx_type, kind, wallet, amount, when);
    txn.id = Some(id);
    txn
}

// ── DailyState ────────────────────────────────────────────────

#[test]
fn test_empty_day() {
    let state = DailyState::detect(&[], day(1), WalletId::Cash);
    assert!(!state.is_opened());
    assert!(!state.is_closed());
    assert_eq!(state.opening_amount(), None);
}

#[test]
fn test_detects_by_kind_not_text() {
    let rows = vec![
        // Text says "opening" but the kind is a sale
        row(1, TxType::Revenue, TxKind::Sale, WalletId::Cash, dec!(20), at(1, 8))
            .with_description("Fond de caisse (ouverture)"),
        row(2, TxType::Revenue, TxKind::OpeningFund, WalletId::Cash, dec!(50), at(1, 9)),
    ];
    let state = DailyState::detect(&rows, day(1), WalletId::Cash);
    assert_eq!(state.opening_fund.unwrap().id, Some(2));
}

#[test]
fn test_scoped_to_wallet_and_day() {
    let rows = vec![
        row(1, TxType::Revenue, TxKind::OpeningFund, WalletId::Safe, dec!(50), at(1, 9)),
        row(2, TxType::Revenue, TxKind::OpeningFund, WalletId::Cash, dec!(50), at(2, 9)),
    ];
    assert!(!DailyState::detect(&rows, day(1), WalletId::Cash).is_opened());
    assert!(DailyState::detect(&rows, day(2), WalletId::Cash).is_opened());
}

#[test]
fn test_earliest_opening_and_latest_closure_win() {
    let rows = vec![
        row(4, TxType::Closure, TxKind::Closure, WalletId::Cash, dec!(60), at(1, 21)),
        row(2, TxType::Revenue, TxKind::OpeningFund, WalletId::Cash, dec!(70), at(1, 10)),
        row(1, TxType::Revenue, TxKind::OpeningFund, WalletId::Cash, dec!(50), at(1, 9)),
        row(3, TxType::Closure, TxKind::Closure, WalletId::Cash, dec!(55), at(1, 20)),
    ];
    let state = DailyState::detect(&rows, day(1), WalletId::Cash);
    assert_eq!(state.opening_amount(), Some(dec!(50)));
    assert_eq!(state.closing_amount(), Some(dec!(60)));

    // Same timestamp: lower id is the earlier record
    let tied = vec![
        row(8, TxType::Revenue, TxKind::OpeningFund, WalletId::Cash, dec!(80), at(1, 9)),
        row(7, TxType::Revenue, TxKind::OpeningFund, WalletId::Cash, dec!(75), at(1, 9)),
    ];
    assert_eq!(DailyState::detect(&tied, day(1), WalletId::Cash).opening_amount(), Some(dec!(75)));
}

#[test]
fn test_opening_amount_prefers_nominal() {
    let rows = vec![
        row(1, TxType::Revenue, TxKind::OpeningFund, WalletId::Cash, dec!(0), at(1, 9)).with_cost_total(dec!(120)),
    ];
    assert_eq!(DailyState::detect(&rows, day(1), WalletId::Cash).opening_amount(), Some(dec!(120)));
}

// ── DailySummary ──────────────────────────────────────────────

#[test]
fn test_summary_excludes_internal_rows() {
    let rows = vec![
        row(1, TxType::Revenue, TxKind::OpeningFund, WalletId::Cash, dec!(50), at(1, 8)).with_cost_total(dec!(50)),
        row(2, TxType::Revenue, TxKind::Sale, WalletId::Cash, dec!(100), at(1, 9)).with_cost_total(dec!(60)),
        row(3, TxType::Revenue, TxKind::Sale, WalletId::Bank, dec!(40), at(1, 10)),
        row(4, TxType::Expense, TxKind::Expense, WalletId::Cash, dec!(15), at(1, 11)),
        row(5, TxType::Expense, TxKind::Transfer, WalletId::Cash, dec!(30), at(1, 12)),
        row(6, TxType::Revenue, TxKind::Transfer, WalletId::Safe, dec!(30), at(1, 12)),
        row(7, TxType::Expense, TxKind::Adjustment, WalletId::Cash, dec!(2), at(1, 13)),
    ];
    let summary = DailySummary::from_transactions(&rows);
    assert_eq!(summary.sales_total, dec!(140));
    assert_eq!(summary.cost_of_goods, dec!(60));
    assert_eq!(summary.gross_profit, dec!(80));
    assert_eq!(summary.expenses, dec!(15));
    assert_eq!(summary.net_profit, dec!(65));
    assert_eq!(summary.sale_count, 2);
    assert_eq!(summary.expense_count, 1);
    assert_eq!(summary.transfer_count, 1);
    assert_eq!(summary.opening_fund, Some(dec!(50)));
}

#[test]
fn test_summary_of_nothing() {
    assert_eq!(DailySummary::from_transactions(&[]), DailySummary::default());
}
