//! Ledger rules on top of the transaction store: balance folds, daily
//! opening/closure state, advisories and the compound write operations.
mod alerts;
mod balance;
mod daily;
mod ops;

pub(crate) use balance::{compute_bounded_balances, running_balances, total, Balances, StatementLine};
pub(crate) use daily::{DailyState, DailySummary};
pub(crate) use ops::{EditInput, LedgerService, OpenMode, SaleInput};
