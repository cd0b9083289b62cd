#![allow(clippy::unwrap_used)]

use std::io::Write;

use rust_decimal_macros::dec;

use super::*;

fn write_toml(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ── Defaults ──────────────────────────────────────────────────

#[test]
fn test_default_rules() {
    let rules = BusinessRules::default();
    assert_eq!(rules.opening_fund, dec!(50));
    assert_eq!(rules.transfer_threshold, dec!(500));
    assert_eq!(rules.min_operating_amount, dec!(50));
    assert_eq!(rules.closure_hour, 20);
    assert_eq!(rules.min_transfer_amount, dec!(10));
    assert_eq!(rules.reconciliation_tolerance, dec!(1));
    assert_eq!(rules.risk_high, dec!(1000));
    assert!(rules.auto_mode);
}

#[test]
fn test_default_registry() {
    let reg = WalletRegistry::default();
    let cash = reg.get(WalletId::Cash);
    assert!(cash.physical);
    assert_eq!(cash.transfer_excess_to, Some(WalletId::Safe));
    assert_eq!(cash.replenish_from, Some(WalletId::Safe));
    assert_eq!(cash.optimal, Some(dec!(100)));

    assert!(reg.get(WalletId::Safe).physical);
    assert!(!reg.get(WalletId::Bank).physical);
    assert_eq!(reg.get(WalletId::PostalCard).alert_threshold, dec!(10));
}

#[test]
fn test_physical_wallets() {
    let reg = WalletRegistry::default();
    let physical: Vec<WalletId> = reg.physical_wallets().collect();
    assert_eq!(physical, vec![WalletId::Cash, WalletId::Safe]);
}

// ── Loading ───────────────────────────────────────────────────

#[test]
fn test_load_without_file_uses_defaults() {
    let settings = Settings::load(None).unwrap();
    assert_eq!(settings.rules.opening_fund, dec!(50));
    assert_eq!(settings.wallets.get(WalletId::Cash).min, dec!(50));
    assert!(settings.classifier.cash.contains(&"caisse".to_string()));
}

#[test]
fn test_load_missing_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let settings = Settings::load(Some(&path)).unwrap();
    assert_eq!(settings.rules.closure_hour, 20);
}

#[test]
fn test_load_overrides_from_file() {
    let file = write_toml(
        r#"
operator = "front-desk"

[rules]
opening_fund = "100"
closure_hour = 23

[wallets.cash]
max = "800"
"#,
    );
    let settings = Settings::load(Some(file.path())).unwrap();
    assert_eq!(settings.operator.as_deref(), Some("front-desk"));
    assert_eq!(settings.rules.opening_fund, dec!(100));
    assert_eq!(settings.rules.closure_hour, 23);
    // Untouched keys keep their defaults
    assert_eq!(settings.rules.min_transfer_amount, dec!(10));
    let cash = settings.wallets.get(WalletId::Cash);
    assert_eq!(cash.max, Some(dec!(800)));
    assert_eq!(cash.transfer_excess_to, Some(WalletId::Safe));
    assert!(cash.physical);
}

#[test]
fn test_load_rejects_bad_closure_hour() {
    let file = write_toml("[rules]\nclosure_hour = 24\n");
    assert!(Settings::load(Some(file.path())).is_err());
}

#[test]
fn test_load_rejects_self_transfer_rule() {
    let file = write_toml("[wallets.safe]\ntransfer_excess_to = \"Safe\"\n");
    assert!(Settings::load(Some(file.path())).is_err());
}

#[test]
fn test_load_accepts_legacy_wallet_label() {
    let file = write_toml("[wallets.postal_card]\ntransfer_excess_to = \"Banque\"\n");
    let settings = Settings::load(Some(file.path())).unwrap();
    assert_eq!(
        settings.wallets.get(WalletId::PostalCard).transfer_excess_to,
        Some(WalletId::Bank)
    );
}
