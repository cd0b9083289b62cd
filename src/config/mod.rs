use anyhow::{Context, Result};
use config::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::WalletId;

/// Business thresholds shared by the alert engine and the ledger operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessRules {
    /// Standard daily opening fund for the cash drawer; also the default
    /// amount kept in the drawer at closure.
    pub opening_fund: Decimal,
    /// Cash above `opening + transfer_threshold` triggers a sweep suggestion.
    pub transfer_threshold: Decimal,
    pub min_operating_amount: Decimal,
    /// Local hour (0-23) from which a missing closure is reported.
    pub closure_hour: u32,
    pub min_transfer_amount: Decimal,
    pub reconciliation_tolerance: Decimal,
    pub risk_medium: Decimal,
    pub risk_high: Decimal,
    pub max_daily_transfers: u32,
    pub auto_mode: bool,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            opening_fund: Decimal::from(50),
            transfer_threshold: Decimal::from(500),
            min_operating_amount: Decimal::from(50),
            closure_hour: 20,
            min_transfer_amount: Decimal::from(10),
            reconciliation_tolerance: Decimal::ONE,
            risk_medium: Decimal::from(500),
            risk_high: Decimal::from(1000),
            max_daily_transfers: 50,
            auto_mode: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletRule {
    pub physical: bool,
    pub min: Decimal,
    pub max: Option<Decimal>,
    pub optimal: Option<Decimal>,
    pub transfer_excess_to: Option<WalletId>,
    pub replenish_from: Option<WalletId>,
    pub alert_threshold: Decimal,
}

impl WalletRule {
    fn digital(excess_to: Option<WalletId>, alert_threshold: Decimal) -> Self {
        Self {
            physical: false,
            min: Decimal::ZERO,
            max: None,
            optimal: None,
            transfer_excess_to: excess_to,
            replenish_from: None,
            alert_threshold,
        }
    }
}

/// The wallet catalog. One entry per [`WalletId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletRegistry {
    pub cash: WalletRule,
    pub bank: WalletRule,
    pub safe: WalletRule,
    pub postal_card: WalletRule,
    pub banker_card: WalletRule,
}

impl Default for WalletRegistry {
    fn default() -> Self {
        Self {
            cash: WalletRule {
                physical: true,
                min: Decimal::from(50),
                max: Some(Decimal::from(500)),
                optimal: Some(Decimal::from(100)),
                transfer_excess_to: Some(WalletId::Safe),
                replenish_from: Some(WalletId::Safe),
                alert_threshold: Decimal::from(50),
            },
            bank: WalletRule::digital(None, Decimal::ZERO),
            safe: WalletRule {
                physical: true,
                ..WalletRule::digital(Some(WalletId::Bank), Decimal::ZERO)
            },
            postal_card: WalletRule::digital(Some(WalletId::Bank), Decimal::from(10)),
            banker_card: WalletRule::digital(Some(WalletId::Bank), Decimal::from(10)),
        }
    }
}

impl WalletRegistry {
    pub fn get(&self, wallet: WalletId) -> &WalletRule {
        match wallet {
            WalletId::Cash => &self.cash,
            WalletId::Bank => &self.bank,
            WalletId::Safe => &self.safe,
            WalletId::PostalCard => &self.postal_card,
            WalletId::BankerCard => &self.banker_card,
        }
    }

    pub fn physical_wallets(&self) -> impl Iterator<Item = WalletId> + '_ {
        WalletId::all()
            .iter()
            .copied()
            .filter(|w| self.get(*w).physical)
    }
}

/// Keyword lists for the legacy wallet/kind heuristics. Matching is
/// case-insensitive substring matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierKeywords {
    pub cash: Vec<String>,
    pub card: Vec<String>,
    pub postal: Vec<String>,
    pub banker: Vec<String>,
    pub safe: Vec<String>,
    pub opening: Vec<String>,
    pub closure: Vec<String>,
    pub transfer: Vec<String>,
    pub adjustment: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassifierKeywords {
    fn default() -> Self {
        Self {
            cash: words(&["cash", "espèces", "especes", "caisse"]),
            card: words(&["card", "carte"]),
            postal: words(&["postal"]),
            banker: words(&["banker"]),
            safe: words(&["safe", "coffre"]),
            opening: words(&["opening", "ouverture", "fond de caisse"]),
            closure: words(&["closure", "cloture", "clôture"]),
            transfer: words(&["transfer", "transfert"]),
            adjustment: words(&["adjustment", "ajustement"]),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Recorded as `user_id` on every row this process writes.
    pub operator: Option<String>,
    pub rules: BusinessRules,
    pub wallets: WalletRegistry,
    pub classifier: ClassifierKeywords,
}

impl Settings {
    /// Layer built-in defaults, the optional TOML file, then `CASHDESK__*`
    /// environment variables (e.g. `CASHDESK__RULES__OPENING_FUND=100`).
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults =
            Config::try_from(&Settings::default()).context("Failed to build default settings")?;
        let mut builder = Config::builder().add_source(defaults);
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix("CASHDESK")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let r = &self.rules;
        if r.closure_hour > 23 {
            anyhow::bail!("rules.closure_hour must be 0-23, got {}", r.closure_hour);
        }
        if r.min_transfer_amount <= Decimal::ZERO {
            anyhow::bail!("rules.min_transfer_amount must be positive");
        }
        if r.reconciliation_tolerance < Decimal::ZERO {
            anyhow::bail!("rules.reconciliation_tolerance cannot be negative");
        }
        if r.risk_high < r.risk_medium {
            anyhow::bail!("rules.risk_high must be at least rules.risk_medium");
        }
        for wallet in WalletId::all() {
            let rule = self.wallets.get(*wallet);
            if rule.transfer_excess_to == Some(*wallet) || rule.replenish_from == Some(*wallet) {
                anyhow::bail!("wallet {wallet} cannot transfer to or replenish from itself");
            }
        }
        Ok(())
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "cashdesk", "CashDesk")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
}

pub(crate) fn config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("cashdesk.toml"))
}

pub(crate) fn db_path() -> Result<PathBuf> {
    let proj_dirs = project_dirs()?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    Ok(data_dir.join("cashdesk.db"))
}

#[cfg(test)]
mod tests;
