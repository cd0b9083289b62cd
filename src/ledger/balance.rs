use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::models::{Transaction, TxKind, WalletId};

pub(crate) type Balances = BTreeMap<WalletId, Decimal>;

fn zeroed() -> Balances {
    WalletId::all().iter().map(|w| (*w, Decimal::ZERO)).collect()
}

/// Signed sum of every row per wallet. Rows without a wallet are skipped;
/// callers tag legacy rows before folding them.
pub(crate) fn compute_balances<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Balances {
    let mut balances = zeroed();
    for txn in transactions {
        if let Some(wallet) = txn.wallet {
            *balances.entry(wallet).or_default() += txn.signed_amount();
        }
    }
    balances
}

/// Fold of a date-bounded slice. An opening-fund row that carries a nominal
/// amount in `cost_total` resets its wallet to that amount; everything else
/// folds as usual. Input must already be in `(created_at, id)` order.
pub(crate) fn compute_bounded_balances<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> Balances {
    let mut balances = zeroed();
    for txn in transactions {
        let Some(wallet) = txn.wallet else { continue };
        let entry = balances.entry(wallet).or_default();
        match (txn.kind, txn.cost_total) {
            (TxKind::OpeningFund, Some(nominal)) => *entry = nominal,
            _ => *entry += txn.signed_amount(),
        }
    }
    balances
}

/// One statement line: the row and its wallet's balance right after it.
#[derive(Debug, Clone)]
pub(crate) struct StatementLine<'a> {
    pub(crate) transaction: &'a Transaction,
    pub(crate) balance_after: Decimal,
}

/// Balance-after per row, each wallet tracked separately. Input must be in
/// `(created_at, id)` order.
pub(crate) fn running_balances(transactions: &[Transaction]) -> Vec<StatementLine<'_>> {
    let mut balances = zeroed();
    transactions
        .iter()
        .filter_map(|txn| {
            let wallet = txn.wallet?;
            let entry = balances.entry(wallet).or_default();
            *entry += txn.signed_amount();
            Some(StatementLine {
                transaction: txn,
                balance_after: *entry,
            })
        })
        .collect()
}

/// Sum across every wallet.
pub(crate) fn total(balances: &Balances) -> Decimal {
    balances.values().copied().sum()
}

#[cfg(test)]
#[path = "balance_tests.rs"]
mod tests;
