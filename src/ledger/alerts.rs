use chrono::{NaiveDateTime, Timelike};
use rust_decimal::Decimal;

use super::balance::Balances;
use super::daily::DailyState;
use crate::config::Settings;
use crate::models::{Alert, AlertCode, Severity, SuggestedAction, Transaction, TxKind, TxType, WalletId};

/// Turn the current balances and today's cash drawer state into advisories,
/// most severe first. Nothing is executed here.
pub(crate) fn evaluate(
    settings: &Settings,
    balances: &Balances,
    cash_state: &DailyState,
    day_transactions: &[Transaction],
    now: NaiveDateTime,
) -> Vec<Alert> {
    let rules = &settings.rules;
    let balance_of = |w: WalletId| balances.get(&w).copied().unwrap_or_default();
    let mut alerts = Vec::new();

    let cash = balance_of(WalletId::Cash);
    let cash_rule = settings.wallets.get(WalletId::Cash);
    let opening = cash_state.opening_amount().unwrap_or(rules.opening_fund);

    if cash > opening + rules.transfer_threshold {
        let excess = cash - opening;
        let mut alert = Alert::new(
            Severity::Warning,
            AlertCode::CashAboveThreshold,
            format!("Cash drawer holds {cash} DT, {excess} DT above the opening fund"),
        )
        .for_wallet(WalletId::Cash);
        if let Some(to) = cash_rule.transfer_excess_to {
            alert = alert.suggest(SuggestedAction::Transfer {
                from: WalletId::Cash,
                to,
                amount: excess,
            });
        }
        alerts.push(alert);
    }

    if cash < rules.min_operating_amount {
        let target = cash_rule.optimal.unwrap_or(rules.min_operating_amount);
        let needed = target - cash;
        let action = match cash_rule.replenish_from {
            Some(from) if balance_of(from) >= needed => SuggestedAction::Transfer {
                from,
                to: WalletId::Cash,
                amount: needed,
            },
            _ => SuggestedAction::AddFunds {
                wallet: WalletId::Cash,
            },
        };
        alerts.push(
            Alert::new(
                Severity::Error,
                AlertCode::CashBelowOperating,
                format!(
                    "Cash drawer holds {cash} DT, below the operating minimum of {} DT",
                    rules.min_operating_amount
                ),
            )
            .for_wallet(WalletId::Cash)
            .suggest(action),
        );
    }

    if !cash_state.is_opened() {
        alerts.push(
            Alert::new(Severity::Info, AlertCode::OpeningMissing, "Cash drawer not opened today")
                .for_wallet(WalletId::Cash)
                .suggest(SuggestedAction::Open {
                    wallet: WalletId::Cash,
                }),
        );
    }

    if now.hour() >= rules.closure_hour && !cash_state.is_closed() {
        alerts.push(
            Alert::new(
                Severity::Warning,
                AlertCode::ClosurePending,
                format!("It is past {}:00 and the cash drawer is not closed", rules.closure_hour),
            )
            .for_wallet(WalletId::Cash)
            .suggest(SuggestedAction::Close {
                wallet: WalletId::Cash,
            }),
        );
    }

    for wallet in settings.wallets.physical_wallets() {
        let balance = balance_of(wallet);
        if balance <= rules.risk_high {
            continue;
        }
        let mut alert = Alert::new(
            Severity::Critical,
            AlertCode::SecurityRisk,
            format!("{} holds {balance} DT in physical money", wallet.display_name()),
        )
        .for_wallet(wallet);
        if let Some(to) = settings.wallets.get(wallet).transfer_excess_to {
            alert = alert.suggest(SuggestedAction::Transfer {
                from: wallet,
                to,
                amount: balance - rules.risk_medium,
            });
        }
        alerts.push(alert);
    }

    // The drawer already has its own low-balance rule above.
    for wallet in WalletId::all().iter().copied().filter(|w| *w != WalletId::Cash) {
        let balance = balance_of(wallet);
        let threshold = settings.wallets.get(wallet).alert_threshold;
        if balance < threshold {
            alerts.push(
                Alert::new(
                    Severity::Warning,
                    AlertCode::LowBalance,
                    format!("{} is low: {balance} DT", wallet.display_name()),
                )
                .for_wallet(wallet),
            );
        }
    }

    let transfers = day_transactions
        .iter()
        .filter(|t| t.kind == TxKind::Transfer && t.tx_type == TxType::Expense)
        .count();
    let soft_limit = Decimal::from(rules.max_daily_transfers) * Decimal::new(8, 1);
    if Decimal::from(transfers) > soft_limit {
        alerts.push(Alert::new(
            Severity::Info,
            AlertCode::DailyTransferLimit,
            format!("{transfers}/{} transfers today", rules.max_daily_transfers),
        ));
    }

    alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
    alerts
}

#[cfg(test)]
#[path = "alerts_tests.rs"]
mod tests;
