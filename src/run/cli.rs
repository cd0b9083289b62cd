use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::path::Path;

use super::report::{self, money};
use super::{now, Shop};
use crate::db::TxFilter;
use crate::import::{parse_decimal, parse_timestamp};
use crate::ledger::{
    compute_bounded_balances, running_balances, DailyState, DailySummary, EditInput, OpenMode,
    SaleInput,
};
use crate::models::WalletId;

pub(crate) fn as_cli(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let Some(command) = args.get(1) else {
        print_usage();
        return Ok(());
    };
    let rest = &args[2..];
    match command.as_str() {
        "balances" | "b" => cli_balances(shop),
        "status" => cli_status(rest, shop),
        "open" => cli_open(rest, shop),
        "close" => cli_close(rest, shop),
        "transfer" | "t" => cli_transfer(rest, shop),
        "reconcile" => cli_reconcile(rest, shop),
        "sale" => cli_sale(rest, shop),
        "expense" => cli_expense(rest, shop),
        "edit" => cli_edit(rest, shop),
        "delete" => cli_delete(rest, shop),
        "list" | "ls" => cli_list(rest, shop),
        "statement" => cli_statement(rest, shop),
        "summary" | "s" => cli_summary(rest, shop),
        "auto" => cli_auto(shop),
        "audit" => cli_audit(rest, shop),
        "import" => cli_import(rest, shop),
        "export" => cli_export(rest, shop),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("cashdesk {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

pub(crate) fn print_usage() {
    println!("CashDesk — shop cash drawer and wallet ledger");
    println!();
    println!("Usage: cashdesk <command>");
    println!();
    println!("Wallets: cash, bank, safe, postal-card, banker-card (French labels accepted)");
    println!();
    println!("Amounts: 12.5 or 12,5 (decimal comma); no thousands separators");
    println!();
    println!("Commands:");
    println!("  balances                      Current balance of every wallet");
    println!("  status [--date YYYY-MM-DD]    Day overview: opening, closure, summary, alerts");
    println!("  open <amount>                 Open a wallet for the day");
    println!("    --wallet <W>                Wallet (default: cash)");
    println!("    --set                       The wallet holds exactly <amount>");
    println!("  close                         Close a wallet, sweeping the excess");
    println!("    --wallet <W>  --keep <X>    Amount to leave (default: opening fund)");
    println!("  transfer <from> <to> <amount> [reason]");
    println!("  reconcile <count> [--wallet W]  Book the difference with a physical count");
    println!("  sale <amount>                 Record a sale");
    println!("    --cost <X> --method <M> --wallet <W> --card-cost <X> --note <T>");
    println!("  expense <wallet> <amount> <description>");
    println!("  edit <id> [--amount X] [--description T] [--at TIMESTAMP]");
    println!("  delete <id>");
    println!("  list [--date D] [--wallet W] [--search T] [--limit N]");
    println!("  statement <wallet> [--limit N]  Running balance of one wallet");
    println!("  summary [--date D | --from D --to D]");
    println!("  auto                          Run automatic security transfers");
    println!("  audit [--repair]              Check stored balances against history");
    println!("  import <legacy.csv>           Import an export of the old hosted store");
    println!("  export [path] [--month YYYY-MM]");
    println!("  --help, -h                    Show this help");
    println!("  --version, -V                 Show version");
}

// ── Argument helpers ─────────────────────────────────────────

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn has_switch(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

/// Arguments that are neither `--flags` nor the values that follow them.
/// `switches` take no value.
fn positionals<'a>(args: &'a [String], switches: &[&str]) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            skip_next = !switches.contains(&arg.as_str());
            continue;
        }
        out.push(arg.as_str());
    }
    out
}

fn parse_wallet(s: &str) -> Result<WalletId> {
    WalletId::parse(s).ok_or_else(|| anyhow::anyhow!("Unknown wallet '{s}'"))
}

fn wallet_flag(args: &[String]) -> Result<WalletId> {
    Ok(flag(args, "--wallet")
        .map(parse_wallet)
        .transpose()?
        .unwrap_or(WalletId::Cash))
}

fn amount_flag(args: &[String], name: &str) -> Result<Option<Decimal>> {
    flag(args, name)
        .map(|s| parse_amount(s).with_context(|| format!("Invalid value for {name}")))
        .transpose()
}

/// Amounts typed by the operator. A comma is a decimal comma ("12,5"), so a
/// comma followed by exactly three digits ("1,000") is refused as ambiguous.
fn parse_amount(s: &str) -> Result<Decimal> {
    let trimmed = s.trim();
    if let Some((_, tail)) = trimmed.rsplit_once(',') {
        if !trimmed.contains('.') && tail.len() == 3 && tail.bytes().all(|b| b.is_ascii_digit()) {
            anyhow::bail!("Ambiguous amount '{s}': write 1000 or 1.000 instead of 1,000");
        }
    }
    parse_decimal(trimmed)
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Invalid date '{s}', expected YYYY-MM-DD"))
}

fn day_flag(args: &[String], name: &str) -> Result<Option<NaiveDate>> {
    flag(args, name).map(parse_day).transpose()
}

fn parse_id(s: Option<&&str>, usage: &str) -> Result<i64> {
    let raw = s.ok_or_else(|| anyhow::anyhow!("Usage: {usage}"))?;
    raw.parse()
        .with_context(|| format!("Invalid transaction id '{raw}'"))
}

/// First and last day of a `YYYY-MM` month.
pub(crate) fn month_range(month: &str) -> Result<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{month}', expected YYYY-MM"))?;
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| anyhow::anyhow!("Month out of range: {month}"))?;
    Ok((first, last))
}

pub(crate) fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/{rest}")
    } else {
        path.to_string()
    }
}

// ── Overview ─────────────────────────────────────────────────

fn cli_balances(shop: &mut Shop<'_>) -> Result<()> {
    let balances = shop.ledger().balances()?;
    print!("{}", report::balances_table(&balances, shop.settings));
    Ok(())
}

fn cli_status(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let at = now();
    let day = day_flag(args, "--date")?.unwrap_or(at.date());
    let rows = shop.db.get_transactions(&TxFilter::day(day))?;
    let cash = DailyState::detect(&rows, day, WalletId::Cash);

    let summary = DailySummary::from_transactions(&rows);
    print!("{}", report::summary_block(&day.to_string(), &summary));
    match cash.opening_amount() {
        Some(amount) => {
            let theoretical = compute_bounded_balances(&rows);
            println!("  Drawer:        opened with {}", money(amount));
            println!(
                "  Expected cash: {}",
                money(theoretical.get(&WalletId::Cash).copied().unwrap_or_default())
            );
        }
        None => println!("  Drawer:        not opened"),
    }
    if let Some(kept) = cash.closing_amount() {
        println!("  Closed with:   {}", money(kept));
    }

    println!();
    let balances = shop.ledger().balances()?;
    print!("{}", report::balances_table(&balances, shop.settings));

    if day == at.date() {
        println!();
        let alerts = shop.ledger().alerts(at)?;
        print!("{}", report::alerts_list(&alerts));
    }
    Ok(())
}

// ── Day cycle ────────────────────────────────────────────────

fn cli_open(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let pos = positionals(args, &["--set"]);
    let raw = pos
        .first()
        .ok_or_else(|| anyhow::anyhow!("Usage: cashdesk open <amount> [--wallet W] [--set]"))?;
    let amount = parse_amount(raw)?;
    let wallet = wallet_flag(args)?;
    let mode = if has_switch(args, "--set") {
        OpenMode::Set
    } else {
        OpenMode::Add
    };

    let report = shop.ledger().open(wallet, amount, mode, now())?;
    if let Some(topped_up) = report.replenished {
        println!("Topped up {} from the backup wallet", money(topped_up));
    }
    if let Some(adjustment) = report.adjustment {
        println!("Adjustment booked: {adjustment:+.2} DT");
    }
    println!("{} opened with {}", wallet.display_name(), money(report.nominal));
    Ok(())
}

fn cli_close(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let wallet = wallet_flag(args)?;
    let keep = amount_flag(args, "--keep")?;

    let report = shop.ledger().close(wallet, keep, now())?;
    if let Some((to, amount)) = report.swept {
        println!("Moved {} to {}", money(amount), to.display_name());
    }
    if let Some(deficit) = report.deficit {
        println!("Warning: {} short of the amount to keep", money(deficit));
    }
    println!("{} closed with {}", wallet.display_name(), money(report.kept));
    Ok(())
}

// ── Movements ────────────────────────────────────────────────

fn cli_transfer(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let pos = positionals(args, &[]);
    if pos.len() < 3 {
        anyhow::bail!("Usage: cashdesk transfer <from> <to> <amount> [reason]");
    }
    let from = parse_wallet(pos[0])?;
    let to = parse_wallet(pos[1])?;
    let amount = parse_amount(pos[2])?;
    let reason = pos[3..].join(" ");

    let receipt = shop.ledger().transfer(from, to, amount, &reason, now())?;
    println!(
        "Transferred {} from {} to {} (#{} / #{})",
        money(receipt.amount),
        from.display_name(),
        to.display_name(),
        receipt.expense_id,
        receipt.revenue_id
    );
    Ok(())
}

fn cli_reconcile(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let pos = positionals(args, &[]);
    let raw = pos
        .first()
        .ok_or_else(|| anyhow::anyhow!("Usage: cashdesk reconcile <count> [--wallet W]"))?;
    let counted = parse_amount(raw)?;
    let wallet = wallet_flag(args)?;

    let result = shop.ledger().reconcile(wallet, counted, now())?;
    println!(
        "{}: counted {}, expected {}, difference {:+.2} DT",
        wallet.display_name(),
        money(result.counted),
        money(result.expected),
        result.difference
    );
    match result.adjustment_id {
        Some(id) => println!("Adjustment #{id} booked"),
        None => println!("Within tolerance, nothing booked"),
    }
    Ok(())
}

fn cli_sale(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let pos = positionals(args, &[]);
    let raw = pos.first().ok_or_else(|| {
        anyhow::anyhow!("Usage: cashdesk sale <amount> [--cost X] [--method M] [--wallet W] [--card-cost X] [--note T]")
    })?;
    let input = SaleInput {
        amount: parse_amount(raw)?,
        cost: amount_flag(args, "--cost")?,
        method: flag(args, "--method").map(str::to_string),
        wallet: flag(args, "--wallet").map(parse_wallet).transpose()?,
        card_cost: amount_flag(args, "--card-cost")?,
        note: flag(args, "--note").unwrap_or_default().to_string(),
    };
    let amount = input.amount;

    let receipt = shop.ledger().record_sale(input, now())?;
    println!(
        "Sale #{} of {} recorded in {}",
        receipt.sale_id,
        money(amount),
        receipt.wallet.display_name()
    );
    if let Some(id) = receipt.card_cost_id {
        println!("Postal card cost booked as #{id}");
    }
    Ok(())
}

fn cli_expense(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let pos = positionals(args, &[]);
    if pos.len() < 3 {
        anyhow::bail!("Usage: cashdesk expense <wallet> <amount> <description>");
    }
    let wallet = parse_wallet(pos[0])?;
    let amount = parse_amount(pos[1])?;
    let description = pos[2..].join(" ");

    let id = shop.ledger().record_expense(wallet, amount, &description, now())?;
    println!("Expense #{id} of {} recorded in {}", money(amount), wallet.display_name());
    Ok(())
}

// ── Corrections ──────────────────────────────────────────────

fn cli_edit(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let pos = positionals(args, &[]);
    let id = parse_id(pos.first(), "cashdesk edit <id> [--amount X] [--description T] [--at TIMESTAMP]")?;
    let input = EditInput {
        amount: amount_flag(args, "--amount")?,
        description: flag(args, "--description").map(str::to_string),
        created_at: flag(args, "--at").map(parse_timestamp).transpose()?,
    };
    if input.amount.is_none() && input.description.is_none() && input.created_at.is_none() {
        anyhow::bail!("Nothing to change: pass --amount, --description or --at");
    }

    let txn = shop.ledger().edit(id, input)?;
    println!("Updated #{id}:");
    print!("{}", report::transactions_table(std::slice::from_ref(&txn)));
    Ok(())
}

fn cli_delete(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let pos = positionals(args, &[]);
    let id = parse_id(pos.first(), "cashdesk delete <id>")?;
    let removed = shop.ledger().delete(id)?;
    println!(
        "Deleted #{id} ({} {})",
        removed.kind,
        money(removed.amount)
    );
    Ok(())
}

// ── History ──────────────────────────────────────────────────

fn cli_list(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let mut filter = match day_flag(args, "--date")? {
        Some(day) => TxFilter::day(day),
        None => TxFilter {
            newest_first: true,
            limit: Some(20),
            ..TxFilter::all()
        },
    };
    filter.wallet = flag(args, "--wallet").map(parse_wallet).transpose()?;
    filter.search = flag(args, "--search").map(str::to_string);
    if let Some(limit) = flag(args, "--limit") {
        filter.limit = Some(limit.parse().with_context(|| format!("Invalid limit '{limit}'"))?);
    }

    let mut rows = shop.db.get_transactions(&filter)?;
    if filter.newest_first {
        rows.reverse();
    }
    print!("{}", report::transactions_table(&rows));
    Ok(())
}

fn cli_statement(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let pos = positionals(args, &[]);
    let raw = pos
        .first()
        .ok_or_else(|| anyhow::anyhow!("Usage: cashdesk statement <wallet> [--limit N]"))?;
    let wallet = parse_wallet(raw)?;
    let limit: usize = match flag(args, "--limit") {
        Some(s) => s.parse().with_context(|| format!("Invalid limit '{s}'"))?,
        None => 30,
    };

    let rows = shop.db.get_transactions(&TxFilter::all().with_wallet(wallet))?;
    let lines = running_balances(&rows);
    let skip = lines.len().saturating_sub(limit);
    println!("{} statement", wallet.display_name());
    print!("{}", report::statement_table(&lines[skip..]));
    Ok(())
}

fn cli_summary(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let today = now().date();
    let (first, last) = match (day_flag(args, "--from")?, day_flag(args, "--to")?) {
        (Some(from), Some(to)) => (from, to),
        (Some(from), None) => (from, today),
        (None, Some(to)) => (to, to),
        (None, None) => {
            let day = day_flag(args, "--date")?.unwrap_or(today);
            (day, day)
        }
    };
    if last < first {
        anyhow::bail!("--to must not be before --from");
    }

    let rows = shop.db.get_transactions(&TxFilter::range(first, last))?;
    let summary = DailySummary::from_transactions(&rows);
    let label = if first == last {
        first.to_string()
    } else {
        format!("{first} to {last}")
    };
    print!("{}", report::summary_block(&label, &summary));
    Ok(())
}

// ── Maintenance ──────────────────────────────────────────────

fn cli_auto(shop: &mut Shop<'_>) -> Result<()> {
    if !shop.settings.rules.auto_mode {
        println!("Auto mode is disabled (rules.auto_mode = false)");
        return Ok(());
    }
    let at = now();
    let alerts = shop.ledger().alerts(at)?;
    let executed = shop.ledger().run_auto_transfers(&alerts, at)?;
    if executed.is_empty() {
        println!("Nothing to do");
    }
    for receipt in &executed {
        println!(
            "Moved {} from {} to {}",
            money(receipt.amount),
            receipt.from.display_name(),
            receipt.to.display_name()
        );
    }
    Ok(())
}

fn cli_audit(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let repair = has_switch(args, "--repair");
    let report = shop.ledger().audit(repair)?;
    println!("Checked {} transactions", report.rows);
    if report.is_clean() {
        println!("Stored balances match history");
        return Ok(());
    }
    for (wallet, stored, folded) in &report.mismatches {
        println!(
            "  {:<14} stored {:>14}  history {:>14}",
            wallet.display_name(),
            money(*stored),
            money(*folded)
        );
    }
    if repair {
        println!("Stored balances rebuilt from history");
    } else {
        println!("Run `cashdesk audit --repair` to rebuild them");
    }
    Ok(())
}

fn cli_import(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let file_path = args
        .first()
        .ok_or_else(|| anyhow::anyhow!("Usage: cashdesk import <legacy.csv>"))?;
    let path = Path::new(file_path);
    if !path.exists() {
        anyhow::bail!("File not found: {file_path}");
    }

    let batch = crate::import::load_legacy(path, shop.classifier)?;
    println!("Parsed {} transactions", batch.transactions.len());
    if batch.tagged > 0 {
        println!("Inferred the wallet of {} rows from their text", batch.tagged);
    }

    let count = shop.db.insert_imported_batch(&batch.transactions)?;
    let dupes = batch.transactions.len() - count;
    println!("Imported {count} new transactions ({dupes} duplicates skipped)");
    println!("The ledger now holds {} transactions", shop.db.get_transaction_count()?);
    Ok(())
}

fn cli_export(args: &[String], shop: &mut Shop<'_>) -> Result<()> {
    let month = flag(args, "--month")
        .map(str::to_string)
        .unwrap_or_else(|| now().format("%Y-%m").to_string());
    let (first, last) = month_range(&month)?;

    let output_path = positionals(args, &[])
        .first()
        .map(|a| shellexpand(a))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            format!("{home}/cashdesk-export-{month}.csv")
        });

    let rows = shop.db.get_transactions(&TxFilter::range(first, last))?;
    if rows.is_empty() {
        println!("No transactions for {month}");
        return Ok(());
    }
    let count = crate::import::export_to_path(Path::new(&output_path), &rows)?;
    println!("Exported {count} transactions to {output_path}");
    Ok(())
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
