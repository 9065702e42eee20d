//! Category moderation rules and platform fee calculation
//!
//! Pure functions over injected configuration. The banned/restricted lists
//! come from `Config`, never from file I/O inside business logic.

/// Category moderation lists. Matching is case-insensitive substring:
/// a campaign category of "Kitchen Knife Set" trips a "knife" entry.
#[derive(Debug, Clone, Default)]
pub struct CategoryRules {
    banned: Vec<String>,
    restricted: Vec<String>,
}

impl CategoryRules {
    pub fn new(banned: Vec<String>, restricted: Vec<String>) -> Self {
        Self {
            banned: banned.into_iter().map(|s| s.to_lowercase()).collect(),
            restricted: restricted.into_iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// Build rules from comma-separated lists (the env-var format)
    pub fn from_csv(banned: &str, restricted: &str) -> Self {
        let split = |s: &str| {
            s.split(',')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect::<Vec<_>>()
        };
        Self::new(split(banned), split(restricted))
    }

    /// Category may never be listed
    pub fn is_banned(&self, category: &str) -> bool {
        let category = category.to_lowercase();
        self.banned.iter().any(|entry| category.contains(entry))
    }

    /// Category requires manual review before going live
    pub fn is_restricted(&self, category: &str) -> bool {
        let category = category.to_lowercase();
        self.restricted.iter().any(|entry| category.contains(entry))
    }
}

/// Platform fee in basis points (5%)
const PLATFORM_FEE_BPS: i64 = 500;

/// Platform fee on a captured total, in minor units, rounded half up
pub fn platform_fee(amount: i64) -> i64 {
    (amount * PLATFORM_FEE_BPS + 5_000) / 10_000
}
