use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use super::WalletId;

/// Storage format for `created_at`. Lexicographic order matches time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxType {
    Revenue,
    Expense,
    /// Non-monetary end-of-day marker.
    Closure,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "Revenue",
            Self::Expense => "Expense",
            Self::Closure => "Closure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "revenue" | "revenu" | "income" => Some(Self::Revenue),
            "expense" | "dépense" | "depense" => Some(Self::Expense),
            "closure" | "cloture" | "clôture" => Some(Self::Closure),
            _ => None,
        }
    }
}

impl std::fmt::Display for TxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Sale,
    Expense,
    Transfer,
    OpeningFund,
    Closure,
    Adjustment,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "Sale",
            Self::Expense => "Expense",
            Self::Transfer => "Transfer",
            Self::OpeningFund => "OpeningFund",
            Self::Closure => "Closure",
            Self::Adjustment => "Adjustment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sale" => Some(Self::Sale),
            "expense" => Some(Self::Expense),
            "transfer" => Some(Self::Transfer),
            "openingfund" | "opening" => Some(Self::OpeningFund),
            "closure" => Some(Self::Closure),
            "adjustment" => Some(Self::Adjustment),
            _ => None,
        }
    }

    /// Kinds that move money between the shop's own wallets or mark the day.
    /// They count toward balances but never toward sales or profit.
    pub fn is_internal(&self) -> bool {
        !matches!(self, Self::Sale | Self::Expense)
    }
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Option<i64>,
    pub tx_type: TxType,
    pub kind: TxKind,
    pub amount: Decimal,
    pub cost_total: Option<Decimal>,
    /// `None` only for legacy rows that have not been through the classifier.
    pub wallet: Option<WalletId>,
    pub source: String,
    pub description: String,
    pub method: Option<String>,
    pub is_internal: bool,
    pub user_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub import_hash: String,
}

impl Transaction {
    pub fn new(
        tx_type: TxType,
        kind: TxKind,
        wallet: WalletId,
        amount: Decimal,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: None,
            tx_type,
            kind,
            amount,
            cost_total: None,
            wallet: Some(wallet),
            source: kind.as_str().to_string(),
            description: String::new(),
            method: None,
            is_internal: kind.is_internal(),
            user_id: None,
            created_at,
            import_hash: String::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_cost_total(mut self, cost_total: Decimal) -> Self {
        self.cost_total = Some(cost_total);
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_user(mut self, user_id: Option<&str>) -> Self {
        self.user_id = user_id.map(str::to_string);
        self
    }

    /// Effect on the wallet balance: +amount, -amount, or zero for markers.
    pub fn signed_amount(&self) -> Decimal {
        match self.tx_type {
            TxType::Revenue => self.amount,
            TxType::Expense => -self.amount,
            TxType::Closure => Decimal::ZERO,
        }
    }

    pub fn day(&self) -> NaiveDate {
        self.created_at.date()
    }

    pub fn timestamp(&self) -> String {
        self.created_at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Revenue minus cost of goods. Internal rows have no margin.
    pub fn margin(&self) -> Decimal {
        if self.is_internal || self.tx_type != TxType::Revenue {
            return Decimal::ZERO;
        }
        self.amount - self.cost_total.unwrap_or_default()
    }
}
