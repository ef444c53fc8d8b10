//! Search predicates and their canonical form.
//!
//! Requests arrive as a loose [`SearchQuery`]; both the store and the cache
//! key are derived from the normalized [`CanonicalQuery`], so two requests
//! that mean the same thing read and cache the same page.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A predicate over company attributes plus a pagination cursor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SearchQuery {
    /// Case-insensitive substring of the company name.
    #[serde(default)]
    pub name: Option<String>,

    /// Leading characters of the uid.
    #[serde(default)]
    pub uid_prefix: Option<String>,

    /// Exact status; when set, `include_inactive` has no effect.
    #[serde(default)]
    pub status: Option<String>,

    /// Exact legal form (e.g., "ЕООД", "AD").
    #[serde(default)]
    pub legal_form: Option<String>,

    /// Substring of the registered address.
    #[serde(default)]
    pub region: Option<String>,

    /// Include companies that are not active.
    #[serde(default)]
    pub include_inactive: bool,

    /// Page size; defaults and caps come from configuration.
    #[serde(default)]
    pub limit: Option<usize>,

    /// Opaque cursor returned by the previous page.
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Default and maximum page size for searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self { default_limit: 25, max_limit: 100 }
    }
}

/// Normalized search predicate.
///
/// `name`, `uid_prefix` and `region` are lower-cased because they match
/// without regard to case. Serializes to key-sorted JSON; the cursor is
/// kept out of the fingerprint and mixed into the cache key separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalQuery {
    pub name: Option<String>,
    pub uid_prefix: Option<String>,
    pub status: Option<String>,
    pub legal_form: Option<String>,
    pub region: Option<String>,
    pub active_only: bool,
    pub limit: usize,
    #[serde(skip)]
    pub cursor: Option<String>,
}

fn normalize(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Normalize a field that is matched case-insensitively.
fn normalize_folded(value: &Option<String>) -> Option<String> {
    normalize(value).map(|s| s.to_lowercase())
}

impl SearchQuery {
    /// Resolve defaults and strip formatting noise.
    pub fn canonicalize(&self, limits: SearchLimits) -> CanonicalQuery {
        let status = normalize(&self.status);
        let limit = self.limit.unwrap_or(limits.default_limit).clamp(1, limits.max_limit);

        CanonicalQuery {
            name: normalize_folded(&self.name),
            uid_prefix: normalize_folded(&self.uid_prefix),
            active_only: status.is_none() && !self.include_inactive,
            status,
            legal_form: normalize(&self.legal_form),
            region: normalize_folded(&self.region),
            limit,
            cursor: normalize(&self.cursor),
        }
    }
}

impl CanonicalQuery {
    /// Stable text form used for hashing.
    pub fn canonical_json(&self) -> String {
        // Going through `Value` sorts object keys.
        serde_json::to_value(self)
            .map(|v| v.to_string())
            .unwrap_or_default()
    }
}
