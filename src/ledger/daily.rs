use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{Transaction, TxKind, TxType, WalletId};

/// Opening and closure records of one wallet for one calendar day.
#[derive(Debug, Clone, Default)]
pub(crate) struct DailyState {
    pub(crate) opening_fund: Option<Transaction>,
    pub(crate) closure_record: Option<Transaction>,
}

fn ordering_key(txn: &Transaction) -> (chrono::NaiveDateTime, i64) {
    (txn.created_at, txn.id.unwrap_or(i64::MAX))
}

impl DailyState {
    /// Detection goes by `kind` only. With several candidates the earliest
    /// opening and the latest closure win.
    pub(crate) fn detect(transactions: &[Transaction], day: NaiveDate, wallet: WalletId) -> Self {
        let candidates = transactions
            .iter()
            .filter(|t| t.is_internal && t.wallet == Some(wallet) && t.day() == day);

        let mut state = Self::default();
        for txn in candidates {
            match txn.kind {
                TxKind::OpeningFund => {
                    let earlier = state
                        .opening_fund
                        .as_ref()
                        .map_or(true, |cur| ordering_key(txn) < ordering_key(cur));
                    if earlier {
                        state.opening_fund = Some(txn.clone());
                    }
                }
                TxKind::Closure => {
                    let later = state
                        .closure_record
                        .as_ref()
                        .map_or(true, |cur| ordering_key(txn) > ordering_key(cur));
                    if later {
                        state.closure_record = Some(txn.clone());
                    }
                }
                _ => {}
            }
        }
        state
    }

    pub(crate) fn is_opened(&self) -> bool {
        self.opening_fund.is_some()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closure_record.is_some()
    }

    /// Nominal opening fund: `cost_total` when the row carries one (set-mode
    /// markers and add-mode rows both do), otherwise the row amount.
    pub(crate) fn opening_amount(&self) -> Option<Decimal> {
        self.opening_fund
            .as_ref()
            .map(|t| t.cost_total.unwrap_or(t.amount))
    }

    /// Amount recorded as kept in the wallet at closure.
    pub(crate) fn closing_amount(&self) -> Option<Decimal> {
        self.closure_record.as_ref().map(|t| t.amount)
    }
}

/// Sales and profit figures for a slice of history. Internal rows never
/// count as sales or expenses.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct DailySummary {
    pub(crate) sales_total: Decimal,
    pub(crate) cost_of_goods: Decimal,
    pub(crate) gross_profit: Decimal,
    pub(crate) expenses: Decimal,
    pub(crate) net_profit: Decimal,
    pub(crate) sale_count: usize,
    pub(crate) expense_count: usize,
    /// Transfers counted once per pair.
    pub(crate) transfer_count: usize,
    /// Cash drawer opening fund of the earliest day in the slice.
    pub(crate) opening_fund: Option<Decimal>,
}

impl DailySummary {
    pub(crate) fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut s = Self::default();
        for txn in transactions {
            match (txn.kind, txn.tx_type) {
                (TxKind::Transfer, TxType::Expense) => s.transfer_count += 1,
                _ if txn.is_internal => {}
                (_, TxType::Revenue) => {
                    s.sales_total += txn.amount;
                    s.cost_of_goods += txn.cost_total.unwrap_or_default();
                    s.gross_profit += txn.margin();
                    s.sale_count += 1;
                }
                (_, TxType::Expense) => {
                    s.expenses += txn.amount;
                    s.expense_count += 1;
                }
                _ => {}
            }
        }
        s.net_profit = s.gross_profit - s.expenses;

        if let Some(first_day) = transactions.iter().map(Transaction::day).min() {
            s.opening_fund = DailyState::detect(transactions, first_day, WalletId::Cash).opening_amount();
        }
        s
    }
}

#[cfg(test)]
#[path = "daily_tests.rs"]
mod tests;
