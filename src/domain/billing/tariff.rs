//! Tariff definitions and per-tariff usage limits.

use serde::{Deserialize, Serialize};

/// Subscription tariff.
///
/// Determines generation quotas and storage limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tariff {
    /// Free tariff - evaluation quotas, no generated attempt feedback.
    Free,
    /// Plus tariff - mid-size monthly quotas.
    Plus,
    /// Pro tariff - largest quotas and storage.
    Pro,
}

impl Tariff {
    /// Returns true if this tariff is a paid tariff.
    pub fn is_paid(&self) -> bool {
        !matches!(self, Tariff::Free)
    }

    /// Returns the display name for this tariff.
    pub fn display_name(&self) -> &'static str {
        match self {
            Tariff::Free => "Free",
            Tariff::Plus => "Plus",
            Tariff::Pro => "Pro",
        }
    }

    /// Returns the numeric rank of this tariff for upgrade comparison.
    pub fn rank(&self) -> u8 {
        match self {
            Tariff::Free => 0,
            Tariff::Plus => 1,
            Tariff::Pro => 2,
        }
    }
}

impl std::fmt::Display for Tariff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Usage limits for a tariff, applied per billing period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffLimits {
    /// The tariff these limits apply to.
    pub tariff: Tariff,
    /// Quiz items that may be generated per period.
    pub quiz_items_limit: u64,
    /// Explainer/feedback messages per period.
    pub messages_limit: u64,
    /// Total uploaded material bytes.
    pub bytes_limit: u64,
}

impl TariffLimits {
    /// Get the limits for a specific tariff.
    ///
    /// # Tariff Configuration
    ///
    /// | Tariff | Quiz items | Messages | Storage |
    /// |--------|-----------|----------|---------|
    /// | Free | 30 | 20 | 10 MiB |
    /// | Plus | 300 | 400 | 200 MiB |
    /// | Pro | 1500 | 2000 | 1 GiB |
    pub fn for_tariff(tariff: Tariff) -> Self {
        match tariff {
            Tariff::Free => Self {
                tariff,
                quiz_items_limit: 30,
                messages_limit: 20,
                bytes_limit: 10 * 1024 * 1024,
            },
            Tariff::Plus => Self {
                tariff,
                quiz_items_limit: 300,
                messages_limit: 400,
                bytes_limit: 200 * 1024 * 1024,
            },
            Tariff::Pro => Self {
                tariff,
                quiz_items_limit: 1500,
                messages_limit: 2000,
                bytes_limit: 1024 * 1024 * 1024,
            },
        }
    }
}
