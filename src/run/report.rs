use rust_decimal::Decimal;
use std::fmt::Write;

use crate::config::Settings;
use crate::ledger::{total, Balances, DailySummary, StatementLine};
use crate::models::{Alert, SuggestedAction, Transaction};

pub(super) fn money(amount: Decimal) -> String {
    format!("{amount:.2} DT")
}

fn rule_line(width: usize) -> String {
    "─".repeat(width)
}

pub(super) fn balances_table(balances: &Balances, settings: &Settings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<14} {:<9} {:>14}  Limits", "Wallet", "Type", "Balance");
    let _ = writeln!(out, "{}", rule_line(56));
    for (wallet, balance) in balances {
        let rule = settings.wallets.get(*wallet);
        let kind = if rule.physical { "physical" } else { "digital" };
        let limits = match rule.max {
            Some(max) => format!("{}–{}", rule.min, max),
            None if rule.min > Decimal::ZERO => format!("min {}", rule.min),
            None => String::new(),
        };
        let _ = writeln!(
            out,
            "{:<14} {:<9} {:>14}  {limits}",
            wallet.display_name(),
            kind,
            money(*balance)
        );
    }
    let _ = writeln!(out, "{}", rule_line(56));
    let _ = writeln!(out, "{:<24} {:>14}", "Total", money(total(balances)));
    out
}

pub(super) fn transactions_table(rows: &[Transaction]) -> String {
    if rows.is_empty() {
        return "No transactions\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<19} {:<11} {:<11} {:>12}  Description",
        "ID", "Time", "Wallet", "Kind", "Amount"
    );
    let _ = writeln!(out, "{}", rule_line(80));
    for txn in rows {
        let _ = writeln!(
            out,
            "{:<6} {:<19} {:<11} {:<11} {:>12}  {}",
            txn.id.unwrap_or(0),
            txn.timestamp(),
            txn.wallet.map(|w| w.as_str()).unwrap_or("?"),
            txn.kind.as_str(),
            format!("{:+.2}", txn.signed_amount()),
            describe(txn),
        );
    }
    out
}

fn describe(txn: &Transaction) -> &str {
    if txn.description.is_empty() {
        &txn.source
    } else {
        &txn.description
    }
}

pub(super) fn statement_table(lines: &[StatementLine<'_>]) -> String {
    if lines.is_empty() {
        return "No transactions\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<19} {:<11} {:>12} {:>14}  Description",
        "Time", "Kind", "Amount", "Balance"
    );
    let _ = writeln!(out, "{}", rule_line(80));
    for line in lines {
        let txn = line.transaction;
        let _ = writeln!(
            out,
            "{:<19} {:<11} {:>12} {:>14}  {}",
            txn.timestamp(),
            txn.kind.as_str(),
            format!("{:+.2}", txn.signed_amount()),
            money(line.balance_after),
            describe(txn),
        );
    }
    out
}

pub(super) fn action_text(action: &SuggestedAction) -> String {
    match action {
        SuggestedAction::Transfer { from, to, amount } => format!(
            "transfer {} from {} to {}",
            money(*amount),
            from.display_name(),
            to.display_name()
        ),
        SuggestedAction::AddFunds { wallet } => format!("add funds to {}", wallet.display_name()),
        SuggestedAction::Open { wallet } => format!("open {}", wallet.display_name()),
        SuggestedAction::Close { wallet } => format!("close {}", wallet.display_name()),
    }
}

pub(super) fn alerts_list(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return "No alerts\n".to_string();
    }
    let mut out = String::new();
    for alert in alerts {
        let _ = write!(out, "[{:<8}] {}", alert.severity.as_str(), alert.message);
        if let Some(action) = &alert.action {
            let _ = write!(out, " → {}", action_text(action));
        }
        if alert.is_auto_executable() {
            let _ = write!(out, " (auto)");
        }
        out.push('\n');
    }
    out
}

pub(super) fn summary_block(label: &str, summary: &DailySummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "CashDesk — {label}");
    let _ = writeln!(out, "{}", rule_line(40));
    if let Some(opening) = summary.opening_fund {
        let _ = writeln!(out, "  Opening fund:  {}", money(opening));
    }
    let _ = writeln!(out, "  Sales:         {} ({} sales)", money(summary.sales_total), summary.sale_count);
    let _ = writeln!(out, "  Cost of goods: {}", money(summary.cost_of_goods));
    let _ = writeln!(out, "  Gross profit:  {}", money(summary.gross_profit));
    let _ = writeln!(out, "  Expenses:      {} ({} expenses)", money(summary.expenses), summary.expense_count);
    let _ = writeln!(out, "  Net profit:    {}", money(summary.net_profit));
    let _ = writeln!(out, "  Transfers:     {}", summary.transfer_count);
    out
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
