use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum WalletId {
    Cash,
    Bank,
    Safe,
    PostalCard,
    BankerCard,
}

impl WalletId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::Bank => "Bank",
            Self::Safe => "Safe",
            Self::PostalCard => "PostalCard",
            Self::BankerCard => "BankerCard",
        }
    }

    /// Human-facing label used in CLI output and generated descriptions.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Cash => "Cash drawer",
            Self::Bank => "Bank",
            Self::Safe => "Safe",
            Self::PostalCard => "Postal card",
            Self::BankerCard => "Banker card",
        }
    }

    /// Accepts the stored identifiers as well as the legacy French labels
    /// found in exports of the old hosted store.
    pub fn parse(s: &str) -> Option<Self> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();
        match key.as_str() {
            "cash" | "caisse" | "drawer" | "cashdrawer" => Some(Self::Cash),
            "bank" | "banque" => Some(Self::Bank),
            "safe" | "coffre" | "coffrefort" => Some(Self::Safe),
            "postalcard" | "cartepostal" | "cartepostale" => Some(Self::PostalCard),
            "bankercard" | "cartebanker" | "banker" => Some(Self::BankerCard),
            _ => None,
        }
    }

    pub fn all() -> &'static [WalletId] {
        &[
            Self::Cash,
            Self::Bank,
            Self::Safe,
            Self::PostalCard,
            Self::BankerCard,
        ]
    }
}

impl std::fmt::Display for WalletId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for WalletId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown wallet '{value}'"))
    }
}

impl Serialize for WalletId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
