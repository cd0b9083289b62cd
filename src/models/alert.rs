use rust_decimal::Decimal;

use super::WalletId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCode {
    CashAboveThreshold,
    CashBelowOperating,
    OpeningMissing,
    ClosurePending,
    SecurityRisk,
    LowBalance,
    DailyTransferLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SuggestedAction {
    Transfer {
        from: WalletId,
        to: WalletId,
        amount: Decimal,
    },
    AddFunds {
        wallet: WalletId,
    },
    Open {
        wallet: WalletId,
    },
    Close {
        wallet: WalletId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub severity: Severity,
    pub code: AlertCode,
    pub wallet: Option<WalletId>,
    pub message: String,
    pub action: Option<SuggestedAction>,
}

impl Alert {
    pub fn new(severity: Severity, code: AlertCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            wallet: None,
            message: message.into(),
            action: None,
        }
    }

    pub fn for_wallet(mut self, wallet: WalletId) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn suggest(mut self, action: SuggestedAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Only critical transfer suggestions may run without an operator.
    pub fn is_auto_executable(&self) -> bool {
        self.severity == Severity::Critical
            && matches!(self.action, Some(SuggestedAction::Transfer { .. }))
    }
}
