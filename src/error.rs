//! Errors raised by the ledger operations.
//!
//! Three families, kept apart so callers can react differently:
//!
//! - store failures ([`LedgerError::Store`]), anything the SQLite layer reports;
//! - validation failures, the request itself is wrong;
//! - state conflicts ([`LedgerError::AlreadyOpened`], [`LedgerError::AlreadyClosed`]).
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::WalletId;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Source and destination wallets must differ ({0})")]
    SameWallet(WalletId),
    #[error("Transfer of {amount} DT is below the minimum of {minimum} DT")]
    BelowMinimumTransfer { amount: Decimal, minimum: Decimal },
    #[error("Insufficient funds in {wallet}: {available} DT available, {required} DT required")]
    InsufficientFunds {
        wallet: WalletId,
        available: Decimal,
        required: Decimal,
    },
    #[error("Missing required text: {0}")]
    MissingText(&'static str),
    #[error("Transaction {0} not found")]
    NotFound(i64),
    #[error("{wallet} is already opened for {day}")]
    AlreadyOpened { wallet: WalletId, day: NaiveDate },
    #[error("{wallet} is already closed for {day}")]
    AlreadyClosed { wallet: WalletId, day: NaiveDate },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl LedgerError {
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::Store(_) | Self::AlreadyOpened { .. } | Self::AlreadyClosed { .. }
        )
    }

    #[cfg(test)]
    pub fn is_state_conflict(&self) -> bool {
        matches!(self, Self::AlreadyOpened { .. } | Self::AlreadyClosed { .. })
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
