#![allow(clippy::unwrap_used)]

use super::*;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal_macros::dec;

use crate::models::TxType;

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 10)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn row(id: i64, tx_type: TxType, kind: TxKind, wallet: WalletId, amount: Decimal, minute: u32) -> Transaction {
    let mut txn = Transaction::new(tx_type, kind, wallet, amount, at(9, minute));
    txn.id = Some(id);
    txn
}

fn history() -> Vec<Transaction> {
    vec![
        row(1, TxType::Revenue, TxKind::OpeningFund, WalletId::Cash, dec!(100), 0),
        row(2, TxType::Revenue, TxKind::Sale, WalletId::Cash, dec!(35.50), 5),
        row(3, TxType::Expense, TxKind::Transfer, WalletId::Cash, dec!(30), 10),
        row(4, TxType::Revenue, TxKind::Transfer, WalletId::Safe, dec!(30), 10),
        row(5, TxType::Expense, TxKind::Expense, WalletId::Bank, dec!(12), 20),
        row(6, TxType::Closure, TxKind::Closure, WalletId::Cash, dec!(105.50), 30),
    ]
}

// ── compute_balances ──────────────────────────────────────────

#[test]
fn test_signed_sum_per_wallet() {
    let balances = compute_balances(&history());
    assert_eq!(balances[&WalletId::Cash], dec!(105.50));
    assert_eq!(balances[&WalletId::Safe], dec!(30));
    assert_eq!(balances[&WalletId::Bank], dec!(-12));
    assert_eq!(balances[&WalletId::PostalCard], dec!(0));
    assert_eq!(balances.len(), WalletId::all().len());
}

#[test]
fn test_fold_is_order_independent() {
    let forward = compute_balances(&history());
    let mut reversed = history();
    reversed.reverse();
    assert_eq!(compute_balances(&reversed), forward);

    let mut shuffled = history();
    shuffled.swap(0, 4);
    shuffled.swap(1, 3);
    assert_eq!(compute_balances(&shuffled), forward);
}

#[test]
fn test_closure_markers_do_not_move_money() {
    let rows = vec![row(1, TxType::Closure, TxKind::Closure, WalletId::Cash, dec!(500), 0)];
    assert_eq!(compute_balances(&rows)[&WalletId::Cash], dec!(0));
}

#[test]
fn test_untagged_rows_are_skipped() {
    let mut untagged = row(1, TxType::Revenue, TxKind::Sale, WalletId::Cash, dec!(9), 0);
    untagged.wallet = None;
    assert_eq!(total(&compute_balances(&[untagged])), dec!(0));
}

#[test]
fn test_transfers_keep_total_unchanged() {
    let rows = history();
    let before: Vec<Transaction> = rows.iter().filter(|t| t.kind != TxKind::Transfer).cloned().collect();
    assert_eq!(total(&compute_balances(&rows)), total(&compute_balances(&before)));
}

// ── compute_bounded_balances ──────────────────────────────────

#[test]
fn test_opening_with_nominal_resets_wallet() {
    let mut rows = vec![row(1, TxType::Revenue, TxKind::Sale, WalletId::Cash, dec!(80), 0)];
    rows.push(
        row(2, TxType::Revenue, TxKind::OpeningFund, WalletId::Cash, dec!(0), 1).with_cost_total(dec!(50)),
    );
    rows.push(row(3, TxType::Revenue, TxKind::Sale, WalletId::Cash, dec!(20), 2));

    let bounded = compute_bounded_balances(&rows);
    assert_eq!(bounded[&WalletId::Cash], dec!(70));
    // The unbounded fold ignores the nominal amount.
    assert_eq!(compute_balances(&rows)[&WalletId::Cash], dec!(100));
}

#[test]
fn test_opening_without_nominal_folds_as_revenue() {
    let rows = vec![
        row(1, TxType::Revenue, TxKind::Sale, WalletId::Cash, dec!(10), 0),
        row(2, TxType::Revenue, TxKind::OpeningFund, WalletId::Cash, dec!(50), 1),
    ];
    assert_eq!(compute_bounded_balances(&rows)[&WalletId::Cash], dec!(60));
}

#[test]
fn test_reset_only_touches_its_wallet() {
    let rows = vec![
        row(1, TxType::Revenue, TxKind::Sale, WalletId::Bank, dec!(40), 0),
        row(2, TxType::Revenue, TxKind::OpeningFund, WalletId::Cash, dec!(50), 1).with_cost_total(dec!(50)),
    ];
    let bounded = compute_bounded_balances(&rows);
    assert_eq!(bounded[&WalletId::Bank], dec!(40));
    assert_eq!(bounded[&WalletId::Cash], dec!(50));
}

// ── running_balances ──────────────────────────────────────────

#[test]
fn test_running_balance_per_wallet() {
    let rows = history();
    let lines = running_balances(&rows);
    assert_eq!(lines.len(), rows.len());
    let after: Vec<Decimal> = lines.iter().map(|l| l.balance_after).collect();
    assert_eq!(
        after,
        vec![dec!(100), dec!(135.50), dec!(105.50), dec!(30), dec!(-12), dec!(105.50)]
    );
    assert_eq!(lines[3].transaction.wallet, Some(WalletId::Safe));
}
