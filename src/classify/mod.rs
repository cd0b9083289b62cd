use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

use crate::config::ClassifierKeywords;
use crate::models::{Transaction, TxKind, TxType, WalletId};

/// Maps transaction rows to wallets and kinds.
///
/// An explicit wallet tag always wins. The keyword heuristics exist for rows
/// exported from the old hosted store, which often lack a wallet or carry
/// their meaning only in free text; the importer runs them once and stores
/// the result.
pub(crate) struct Classifier {
    cash: Keywords,
    card: Keywords,
    postal: Keywords,
    banker: Keywords,
    safe: Keywords,
    opening: Keywords,
    closure: Keywords,
    transfer: Keywords,
    adjustment: Keywords,
}

/// Case-insensitive alternation of literal keywords. Empty lists never match.
struct Keywords(Option<Regex>);

impl Keywords {
    fn compile(name: &str, words: &[String]) -> Result<Self> {
        let parts: Vec<String> = words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .map(regex::escape)
            .collect();
        if parts.is_empty() {
            return Ok(Self(None));
        }
        let regex = RegexBuilder::new(&parts.join("|"))
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid {name} keywords"))?;
        Ok(Self(Some(regex)))
    }

    fn hit(&self, text: &str) -> bool {
        self.0.as_ref().is_some_and(|re| re.is_match(text))
    }

    fn any(&self, texts: &[&str]) -> bool {
        texts.iter().any(|t| self.hit(t))
    }
}

impl Classifier {
    pub(crate) fn new(keywords: &ClassifierKeywords) -> Result<Self> {
        Ok(Self {
            cash: Keywords::compile("cash", &keywords.cash)?,
            card: Keywords::compile("card", &keywords.card)?,
            postal: Keywords::compile("postal", &keywords.postal)?,
            banker: Keywords::compile("banker", &keywords.banker)?,
            safe: Keywords::compile("safe", &keywords.safe)?,
            opening: Keywords::compile("opening", &keywords.opening)?,
            closure: Keywords::compile("closure", &keywords.closure)?,
            transfer: Keywords::compile("transfer", &keywords.transfer)?,
            adjustment: Keywords::compile("adjustment", &keywords.adjustment)?,
        })
    }

    pub(crate) fn classify(&self, txn: &Transaction) -> WalletId {
        if let Some(wallet) = txn.wallet {
            return wallet;
        }

        let method = txn.method.as_deref().unwrap_or("");
        let source = txn.source.as_str();
        let description = txn.description.as_str();

        if self.cash.any(&[method, source]) {
            return WalletId::Cash;
        }
        if self.card.any(&[method, source, description]) {
            if self.postal.any(&[source, description]) {
                return WalletId::PostalCard;
            }
            if self.banker.any(&[source, description]) {
                return WalletId::BankerCard;
            }
            return WalletId::Bank;
        }
        if self.safe.any(&[source, description]) {
            return WalletId::Safe;
        }

        WalletId::Cash
    }

    /// Wallet for a live sale, from the payment method alone. Free text on
    /// the sale never moves it.
    pub(crate) fn wallet_for_method(&self, method: &str) -> WalletId {
        if self.cash.hit(method) {
            WalletId::Cash
        } else if self.postal.hit(method) {
            WalletId::PostalCard
        } else if self.banker.hit(method) {
            WalletId::BankerCard
        } else if self.card.hit(method) {
            WalletId::Bank
        } else {
            WalletId::Cash
        }
    }

    /// Recover the structured kind of a legacy row from its type, internal
    /// flag and text.
    pub(crate) fn infer_kind(
        &self,
        tx_type: TxType,
        is_internal: bool,
        source: &str,
        description: &str,
    ) -> TxKind {
        let texts = [source, description];
        if tx_type == TxType::Closure {
            return TxKind::Closure;
        }
        if is_internal && self.opening.any(&texts) {
            return TxKind::OpeningFund;
        }
        if self.transfer.any(&texts) {
            return TxKind::Transfer;
        }
        if is_internal && self.closure.any(&texts) {
            return TxKind::Closure;
        }
        if is_internal {
            // Adjustments and anything else internal land here.
            if !self.adjustment.any(&texts) {
                tracing::debug!(source, description, "untyped internal row treated as adjustment");
            }
            return TxKind::Adjustment;
        }
        match tx_type {
            TxType::Expense => TxKind::Expense,
            _ => TxKind::Sale,
        }
    }

    /// Stamp an explicit wallet on every row that lacks one.
    pub(crate) fn tag_batch(&self, transactions: &mut [Transaction]) -> usize {
        let mut tagged = 0;
        for txn in transactions.iter_mut() {
            if txn.wallet.is_none() {
                txn.wallet = Some(self.classify(txn));
                tagged += 1;
            }
        }
        tagged
    }
}
