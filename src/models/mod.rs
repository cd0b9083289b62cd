mod alert;
mod transaction;
mod wallet;

pub use alert::{Alert, AlertCode, Severity, SuggestedAction};
pub use transaction::{Transaction, TxKind, TxType, TIMESTAMP_FORMAT};
pub use wallet::WalletId;

#[cfg(test)]
mod tests;
