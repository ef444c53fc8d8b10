//! Company records as held by the durable store.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A commercial-register company record.
///
/// `uid` is immutable once assigned. `created_at` and `updated_at` are owned
/// by the store: values supplied on import are ignored, and `updated_at` only
/// moves when an upsert actually changes an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct CompanyRecord {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub manager: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub legal_form: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub registration_date: Option<String>,
    #[serde(default)]
    pub capital: Option<String>,
    #[serde(default)]
    pub main_activity: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl CompanyRecord {
    /// Create a record with only the required fields set.
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self { uid: uid.into(), name: name.into(), ..Default::default() }
    }

    /// Compare register attributes, ignoring store-owned timestamps.
    pub fn same_attributes(&self, other: &Self) -> bool {
        self.uid == other.uid
            && self.name == other.name
            && self.manager == other.manager
            && self.address == other.address
            && self.legal_form == other.legal_form
            && self.status == other.status
            && self.registration_date == other.registration_date
            && self.capital == other.capital
            && self.main_activity == other.main_activity
            && self.phone == other.phone
            && self.email == other.email
            && self.website == other.website
    }
}

/// Status spellings the register uses for an active company.
pub const ACTIVE_STATUSES: &[&str] = &["active", "Active", "Активен", "активен"];

/// Whether an upsert inserted a new row or hit an existing uid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WriteStatus {
    Created,
    Updated,
}

/// A successful upsert together with the row as now stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    pub status: WriteStatus,
    pub record: CompanyRecord,
}

/// One page of records plus the position to continue from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RecordPage {
    pub records: Vec<CompanyRecord>,
    /// Opaque cursor for the next page; absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl RecordPage {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
