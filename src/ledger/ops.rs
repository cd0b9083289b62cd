use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use super::alerts;
use super::balance::{compute_balances, Balances};
use super::daily::DailyState;
use crate::classify::Classifier;
use crate::config::Settings;
use crate::db::{Database, LedgerTx, TxFilter};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Alert, SuggestedAction, Transaction, TxKind, TxType, WalletId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenMode {
    /// Put `amount` into the wallet on top of what is already there.
    Add,
    /// The wallet should hold exactly `amount`; the gap is booked as an adjustment.
    Set,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OpeningReport {
    pub(crate) wallet: WalletId,
    pub(crate) opening_id: i64,
    pub(crate) nominal: Decimal,
    /// Amount pulled from the backup wallet to reach the wallet minimum.
    pub(crate) replenished: Option<Decimal>,
    /// Signed correction booked in set mode.
    pub(crate) adjustment: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClosureReport {
    pub(crate) wallet: WalletId,
    pub(crate) closure_id: i64,
    pub(crate) kept: Decimal,
    pub(crate) swept: Option<(WalletId, Decimal)>,
    /// How far the balance fell short of the amount to keep.
    pub(crate) deficit: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TransferReceipt {
    pub(crate) from: WalletId,
    pub(crate) to: WalletId,
    pub(crate) amount: Decimal,
    pub(crate) expense_id: i64,
    pub(crate) revenue_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Reconciliation {
    pub(crate) wallet: WalletId,
    pub(crate) expected: Decimal,
    pub(crate) counted: Decimal,
    pub(crate) difference: Decimal,
    pub(crate) adjustment_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SaleInput {
    pub(crate) amount: Decimal,
    pub(crate) cost: Option<Decimal>,
    pub(crate) method: Option<String>,
    pub(crate) wallet: Option<WalletId>,
    /// Service cost charged on the postal card for this sale.
    pub(crate) card_cost: Option<Decimal>,
    pub(crate) note: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SaleReceipt {
    pub(crate) sale_id: i64,
    pub(crate) wallet: WalletId,
    pub(crate) card_cost_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct EditInput {
    pub(crate) amount: Option<Decimal>,
    pub(crate) description: Option<String>,
    pub(crate) created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AuditReport {
    pub(crate) rows: usize,
    /// `(wallet, snapshot, folded)` for every wallet that disagrees.
    pub(crate) mismatches: Vec<(WalletId, Decimal, Decimal)>,
}

impl AuditReport {
    pub(crate) fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Money amounts: strictly positive, at most two decimal places.
fn validate_amount(amount: Decimal, what: &str) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!("{what} must be positive, got {amount}")));
    }
    validate_scale(amount, what)
}

/// Counts and targets: zero allowed.
fn validate_count(amount: Decimal, what: &str) -> LedgerResult<()> {
    if amount < Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!("{what} cannot be negative, got {amount}")));
    }
    validate_scale(amount, what)
}

fn validate_scale(amount: Decimal, what: &str) -> LedgerResult<()> {
    if amount.normalize().scale() > 2 {
        return Err(LedgerError::InvalidAmount(format!(
            "{what} has more than two decimal places: {amount}"
        )));
    }
    Ok(())
}

/// Expense leg on `from`, revenue leg on `to`, one shared description.
fn insert_transfer(
    tx: &LedgerTx<'_>,
    from: WalletId,
    to: WalletId,
    amount: Decimal,
    reason: &str,
    at: NaiveDateTime,
    user: Option<&str>,
) -> LedgerResult<TransferReceipt> {
    let description = format!("{} -> {}: {reason}", from.display_name(), to.display_name());
    let out = Transaction::new(TxType::Expense, TxKind::Transfer, from, amount, at)
        .with_description(description.clone())
        .with_user(user);
    let into = Transaction::new(TxType::Revenue, TxKind::Transfer, to, amount, at)
        .with_description(description)
        .with_user(user);
    let expense_id = tx.insert(&out)?;
    let revenue_id = tx.insert(&into)?;
    tracing::info!(%from, %to, %amount, reason, "transfer recorded");
    Ok(TransferReceipt {
        from,
        to,
        amount,
        expense_id,
        revenue_id,
    })
}

fn day_state(tx: &LedgerTx<'_>, wallet: WalletId, day: NaiveDate) -> LedgerResult<DailyState> {
    let filter = TxFilter::day(day)
        .with_wallet(wallet)
        .with_kinds(&[TxKind::OpeningFund, TxKind::Closure]);
    let rows = tx.transactions(&filter)?;
    Ok(DailyState::detect(&rows, day, wallet))
}

fn adjustment(wallet: WalletId, delta: Decimal, at: NaiveDateTime, note: &str) -> Transaction {
    let tx_type = if delta > Decimal::ZERO {
        TxType::Revenue
    } else {
        TxType::Expense
    };
    Transaction::new(tx_type, TxKind::Adjustment, wallet, delta.abs(), at).with_description(note)
}

/// The compound write operations. Each one validates its input, then runs in
/// a single store transaction.
pub(crate) struct LedgerService<'a> {
    db: &'a mut Database,
    settings: &'a Settings,
    classifier: &'a Classifier,
}

impl<'a> LedgerService<'a> {
    pub(crate) fn new(db: &'a mut Database, settings: &'a Settings, classifier: &'a Classifier) -> Self {
        Self {
            db,
            settings,
            classifier,
        }
    }

    fn operator(&self) -> Option<&'a str> {
        self.settings.operator.as_deref()
    }

    // ── Day cycle ─────────────────────────────────────────────

    pub(crate) fn open(
        &mut self,
        wallet: WalletId,
        amount: Decimal,
        mode: OpenMode,
        at: NaiveDateTime,
    ) -> LedgerResult<OpeningReport> {
        match mode {
            OpenMode::Add => validate_amount(amount, "opening amount")?,
            OpenMode::Set => validate_count(amount, "opening amount")?,
        }
        let rule = self.settings.wallets.get(wallet).clone();
        let user = self.operator();

        let report = self.db.with_tx(|tx| {
            let day = at.date();
            if day_state(tx, wallet, day)?.is_opened() {
                return Err(LedgerError::AlreadyOpened { wallet, day });
            }
            let balance = tx.balance(wallet)?;

            match mode {
                OpenMode::Add => {
                    let shortfall = rule.min - (balance + amount);
                    let mut replenished = None;
                    if shortfall > Decimal::ZERO {
                        let Some(backup) = rule.replenish_from else {
                            return Err(LedgerError::InsufficientFunds {
                                wallet,
                                available: balance + amount,
                                required: rule.min,
                            });
                        };
                        let available = tx.balance(backup)?;
                        if available < shortfall {
                            return Err(LedgerError::InsufficientFunds {
                                wallet: backup,
                                available,
                                required: shortfall,
                            });
                        }
                        insert_transfer(tx, backup, wallet, shortfall, "opening top-up", at, user)?;
                        replenished = Some(shortfall);
                    }

                    let nominal = tx.balance(wallet)? + amount;
                    let row = Transaction::new(TxType::Revenue, TxKind::OpeningFund, wallet, amount, at)
                        .with_cost_total(nominal)
                        .with_description(format!("Opening fund {}", wallet.display_name()))
                        .with_user(user);
                    let opening_id = tx.insert(&row)?;
                    Ok(OpeningReport {
                        wallet,
                        opening_id,
                        nominal,
                        replenished,
                        adjustment: None,
                    })
                }
                OpenMode::Set => {
                    let delta = amount - balance;
                    let mut correction = None;
                    if !delta.is_zero() {
                        let note = format!("Opening count {amount} DT, ledger had {balance} DT");
                        tx.insert(&adjustment(wallet, delta, at, &note).with_user(user))?;
                        correction = Some(delta);
                    }
                    let marker = Transaction::new(TxType::Revenue, TxKind::OpeningFund, wallet, Decimal::ZERO, at)
                        .with_cost_total(amount)
                        .with_description(format!("Opening fund {} (set)", wallet.display_name()))
                        .with_user(user);
                    let opening_id = tx.insert(&marker)?;
                    Ok(OpeningReport {
                        wallet,
                        opening_id,
                        nominal: amount,
                        replenished: None,
                        adjustment: correction,
                    })
                }
            }
        })?;

        tracing::info!(%wallet, nominal = %report.nominal, ?mode, "wallet opened");
        Ok(report)
    }

    /// End-of-day closure. `keep` defaults to the day's opening fund, or the
    /// configured standard fund when the wallet was not opened.
    pub(crate) fn close(
        &mut self,
        wallet: WalletId,
        keep: Option<Decimal>,
        at: NaiveDateTime,
    ) -> LedgerResult<ClosureReport> {
        if let Some(keep) = keep {
            validate_count(keep, "amount to keep")?;
        }
        let min_transfer = self.settings.rules.min_transfer_amount;
        let default_keep = self.settings.rules.opening_fund;
        let excess_to = self.settings.wallets.get(wallet).transfer_excess_to;
        let user = self.operator();

        let report = self.db.with_tx(|tx| {
            let day = at.date();
            let state = day_state(tx, wallet, day)?;
            if state.is_closed() {
                return Err(LedgerError::AlreadyClosed { wallet, day });
            }
            let keep = keep.or(state.opening_amount()).unwrap_or(default_keep);
            let balance = tx.balance(wallet)?;
            let excess = (balance - keep).max(Decimal::ZERO);

            let mut swept = None;
            if let Some(dest) = excess_to.filter(|_| excess >= min_transfer) {
                insert_transfer(tx, wallet, dest, excess, "closure sweep", at, user)?;
                swept = Some((dest, excess));
            }

            let kept = tx.balance(wallet)?;
            let deficit = (balance < keep).then(|| keep - balance);
            let marker = Transaction::new(TxType::Closure, TxKind::Closure, wallet, kept, at)
                .with_description(format!("Closing balance {}: {kept} DT", wallet.display_name()))
                .with_user(user);
            let closure_id = tx.insert(&marker)?;
            Ok(ClosureReport {
                wallet,
                closure_id,
                kept,
                swept,
                deficit,
            })
        })?;

        if let Some(deficit) = report.deficit {
            tracing::warn!(%wallet, %deficit, "closed below the amount to keep");
        }
        tracing::info!(%wallet, kept = %report.kept, "wallet closed");
        Ok(report)
    }

    // ── Movements ─────────────────────────────────────────────

    pub(crate) fn transfer(
        &mut self,
        from: WalletId,
        to: WalletId,
        amount: Decimal,
        reason: &str,
        at: NaiveDateTime,
    ) -> LedgerResult<TransferReceipt> {
        validate_amount(amount, "transfer amount")?;
        if from == to {
            return Err(LedgerError::SameWallet(from));
        }
        let minimum = self.settings.rules.min_transfer_amount;
        if amount < minimum {
            return Err(LedgerError::BelowMinimumTransfer { amount, minimum });
        }
        let reason = match reason.trim() {
            "" => "manual transfer",
            r => r,
        };
        let user = self.operator();

        self.db.with_tx(|tx| {
            let available = tx.balance(from)?;
            if amount > available {
                return Err(LedgerError::InsufficientFunds {
                    wallet: from,
                    available,
                    required: amount,
                });
            }
            insert_transfer(tx, from, to, amount, reason, at, user)
        })
    }

    /// Compare a physical count with the ledger. Only a difference beyond the
    /// tolerance is booked.
    pub(crate) fn reconcile(
        &mut self,
        wallet: WalletId,
        counted: Decimal,
        at: NaiveDateTime,
    ) -> LedgerResult<Reconciliation> {
        validate_count(counted, "physical count")?;
        let tolerance = self.settings.rules.reconciliation_tolerance;
        let user = self.operator();

        let result = self.db.with_tx(|tx| {
            let expected = tx.balance(wallet)?;
            let difference = counted - expected;
            let mut adjustment_id = None;
            if difference.abs() > tolerance {
                let note = format!("Reconciliation: counted {counted} DT, expected {expected} DT");
                adjustment_id = Some(tx.insert(&adjustment(wallet, difference, at, &note).with_user(user))?);
            }
            Ok::<_, LedgerError>(Reconciliation {
                wallet,
                expected,
                counted,
                difference,
                adjustment_id,
            })
        })?;

        if result.adjustment_id.is_some() {
            tracing::warn!(%wallet, difference = %result.difference, "reconciliation adjustment booked");
        } else {
            tracing::info!(%wallet, difference = %result.difference, "reconciled within tolerance");
        }
        Ok(result)
    }

    pub(crate) fn record_sale(&mut self, input: SaleInput, at: NaiveDateTime) -> LedgerResult<SaleReceipt> {
        validate_amount(input.amount, "sale amount")?;
        if let Some(cost) = input.cost {
            validate_count(cost, "cost of goods")?;
        }
        if let Some(card_cost) = input.card_cost {
            validate_amount(card_cost, "postal card cost")?;
        }

        let method = input.method.as_deref().map(str::trim).filter(|m| !m.is_empty());
        let wallet = input
            .wallet
            .unwrap_or_else(|| self.classifier.wallet_for_method(method.unwrap_or("")));

        let mut sale = Transaction::new(TxType::Revenue, TxKind::Sale, wallet, input.amount, at)
            .with_description(input.note.trim())
            .with_user(self.operator());
        sale.cost_total = input.cost;
        if let Some(method) = method {
            sale = sale
                .with_method(method)
                .with_source(format!("Sale - {method}"));
        }

        let card_row = input.card_cost.map(|cost| {
            Transaction::new(TxType::Expense, TxKind::Adjustment, WalletId::PostalCard, cost, at)
                .with_source("Postal card deduction")
                .with_description(format!("Service cost for sale of {} DT", input.amount))
                .with_user(self.operator())
        });

        let receipt = self.db.with_tx(|tx| {
            let sale_id = tx.insert(&sale)?;
            let card_cost_id = card_row.as_ref().map(|row| tx.insert(row)).transpose()?;
            Ok::<_, LedgerError>(SaleReceipt {
                sale_id,
                wallet,
                card_cost_id,
            })
        })?;
        tracing::info!(%wallet, amount = %input.amount, "sale recorded");
        Ok(receipt)
    }

    pub(crate) fn record_expense(
        &mut self,
        wallet: WalletId,
        amount: Decimal,
        description: &str,
        at: NaiveDateTime,
    ) -> LedgerResult<i64> {
        validate_amount(amount, "expense amount")?;
        let description = description.trim();
        if description.is_empty() {
            return Err(LedgerError::MissingText("expense description"));
        }
        let physical = self.settings.wallets.get(wallet).physical;
        let row = Transaction::new(TxType::Expense, TxKind::Expense, wallet, amount, at)
            .with_description(description)
            .with_user(self.operator());

        let id = self.db.with_tx(|tx| {
            let available = tx.balance(wallet)?;
            if physical && amount > available {
                return Err(LedgerError::InsufficientFunds {
                    wallet,
                    available,
                    required: amount,
                });
            }
            Ok(tx.insert(&row)?)
        })?;
        tracing::info!(%wallet, %amount, "expense recorded");
        Ok(id)
    }

    // ── Corrections ───────────────────────────────────────────

    /// Amend a row. The result must satisfy the same amount and balance rules
    /// as a freshly written row.
    pub(crate) fn edit(&mut self, id: i64, input: EditInput) -> LedgerResult<Transaction> {
        if let Some(amount) = input.amount {
            validate_count(amount, "amount")?;
        }
        let wallets = &self.settings.wallets;
        let updated = self.db.with_tx(|tx| {
            let mut txn = tx.get(id)?.ok_or(LedgerError::NotFound(id))?;
            let before = txn.signed_amount();
            if let Some(amount) = input.amount {
                // Opening and closure markers may carry zero.
                if !matches!(txn.kind, TxKind::OpeningFund | TxKind::Closure) {
                    validate_amount(amount, "amount")?;
                }
                txn.amount = amount;
            }
            if let Some(description) = &input.description {
                txn.description = description.trim().to_string();
            }
            if let Some(created_at) = input.created_at {
                txn.created_at = created_at;
            }

            if let Some(wallet) = txn.wallet.filter(|w| wallets.get(*w).physical) {
                let available = tx.balance(wallet)? - before;
                let after = available + txn.signed_amount();
                if input.amount.is_some() && after < Decimal::ZERO {
                    return Err(LedgerError::InsufficientFunds {
                        wallet,
                        available,
                        required: -txn.signed_amount(),
                    });
                }
            }
            tx.update(id, &txn)?;
            Ok::<_, LedgerError>(txn)
        })?;
        if updated.kind == TxKind::Transfer && input.amount.is_some() {
            tracing::warn!(id, "edited one leg of a transfer; the pair no longer balances");
        }
        tracing::info!(id, "transaction edited");
        Ok(updated)
    }

    pub(crate) fn delete(&mut self, id: i64) -> LedgerResult<Transaction> {
        let removed = self
            .db
            .with_tx(|tx| tx.delete(id)?.ok_or(LedgerError::NotFound(id)))?;
        if removed.kind == TxKind::Transfer {
            tracing::warn!(id, description = %removed.description, "deleted one leg of a transfer");
        }
        tracing::info!(id, "transaction deleted");
        Ok(removed)
    }

    // ── Advisories ────────────────────────────────────────────

    pub(crate) fn balances(&self) -> LedgerResult<Balances> {
        Ok(self.db.get_balances()?)
    }

    pub(crate) fn alerts(&self, now: NaiveDateTime) -> LedgerResult<Vec<Alert>> {
        let balances = self.db.get_balances()?;
        let today = self.db.get_transactions(&TxFilter::day(now.date()))?;
        let cash_state = DailyState::detect(&today, now.date(), WalletId::Cash);
        Ok(alerts::evaluate(self.settings, &balances, &cash_state, &today, now))
    }

    /// Execute the transfers suggested by auto-executable alerts. Alerts that
    /// no longer pass validation are skipped.
    pub(crate) fn run_auto_transfers(
        &mut self,
        alerts: &[Alert],
        at: NaiveDateTime,
    ) -> LedgerResult<Vec<TransferReceipt>> {
        if !self.settings.rules.auto_mode {
            tracing::debug!("auto mode disabled");
            return Ok(Vec::new());
        }
        let mut executed = Vec::new();
        for alert in alerts.iter().filter(|a| a.is_auto_executable()) {
            let Some(SuggestedAction::Transfer { from, to, amount }) = alert.action else {
                continue;
            };
            match self.transfer(from, to, amount, "automatic security transfer", at) {
                Ok(receipt) => executed.push(receipt),
                Err(e) if e.is_validation() => {
                    tracing::warn!(%from, %to, %amount, error = %e, "automatic transfer skipped");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(executed)
    }

    /// Refold the whole history and compare it with the stored snapshot.
    pub(crate) fn audit(&mut self, repair: bool) -> LedgerResult<AuditReport> {
        let rows = self.db.get_transactions(&TxFilter::all())?;
        let folded = compute_balances(&rows);
        let snapshot = self.db.get_balances()?;
        let mismatches: Vec<_> = WalletId::all()
            .iter()
            .filter_map(|w| {
                let stored = snapshot.get(w).copied().unwrap_or_default();
                let expected = folded.get(w).copied().unwrap_or_default();
                (stored != expected).then_some((*w, stored, expected))
            })
            .collect();

        if !mismatches.is_empty() {
            tracing::warn!(count = mismatches.len(), "balance snapshot disagrees with history");
            if repair {
                self.db.replace_balances(&folded)?;
            }
        }
        Ok(AuditReport {
            rows: rows.len(),
            mismatches,
        })
    }
}

#[cfg(test)]
#[path = "ops_tests.rs"]
mod tests;
