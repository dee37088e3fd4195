use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::MissingAttributePolicy;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A raw user identifier: integer or string.
///
/// Total order: integers compare numerically and sort before every string;
/// strings compare lexicographically. Variant order below is load-bearing
/// for the derived `Ord`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Int(i64),
    Str(String),
}

impl UserId {
    /// Parse a cell into an ID. Integral text (including `"7.0"`, which is how
    /// float-typed exports render integer columns) becomes `Int`, anything
    /// else non-empty becomes `Str`. Blank cells yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(n) = s.parse::<i64>() {
            return Some(Self::Int(n));
        }
        if let Some(whole) = s.strip_suffix(".0") {
            if let Ok(n) = whole.parse::<i64>() {
                return Some(Self::Int(n));
            }
        }
        Some(Self::Str(s.to_string()))
    }
}

impl From<i64> for UserId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Normalized contact attribute used only to link records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MatchKey {
    Phone(String),
    Email(String),
}

impl std::fmt::Display for MatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Phone(digits) => write!(f, "PHONE_{digits}"),
            Self::Email(addr) => write!(f, "EMAIL_{addr}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A user row as received. `None` means the cell was missing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Every cell of the source row as `(header, value)`, in column order.
    #[serde(skip)]
    pub raw_fields: Vec<(String, String)>,
}

impl UserRecord {
    /// Build a row whose source columns are exactly `id`, `phone`, `email`.
    pub fn new(id: impl Into<UserId>, phone: Option<&str>, email: Option<&str>) -> Self {
        let id = id.into();
        let raw_fields = vec![
            ("id".to_string(), id.to_string()),
            ("phone".to_string(), phone.unwrap_or_default().to_string()),
            ("email".to_string(), email.unwrap_or_default().to_string()),
        ];
        Self {
            id,
            phone: phone.map(str::to_string),
            email: email.map(str::to_string),
            raw_fields,
        }
    }

    /// Raw cell under `header`, if the source had that column.
    pub fn field(&self, header: &str) -> Option<&str> {
        lookup_field(&self.raw_fields, header)
    }
}

fn lookup_field<'a>(fields: &'a [(String, String)], header: &str) -> Option<&'a str> {
    fields.iter().find(|(h, _)| h == header).map(|(_, v)| v.as_str())
}

/// An order row as received. Monetary and time fields stay raw strings.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRecord {
    pub user_id: Option<UserId>,
    pub quantity: f64,
    pub unit_price: Option<String>,
    pub timestamp: Option<String>,
    pub book_id: Option<String>,
    /// Every cell of the source row as `(header, value)`, in column order.
    /// Drives exact-duplicate detection and CSV export.
    #[serde(skip)]
    pub raw_fields: Vec<(String, String)>,
}

impl OrderRecord {
    /// Raw cell under `header`, if the source had that column.
    pub fn field(&self, header: &str) -> Option<&str> {
        lookup_field(&self.raw_fields, header)
    }
}

/// A catalog entry. `authors` keeps the source order.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogRecord {
    pub id: Option<String>,
    pub authors: Vec<String>,
    #[serde(skip)]
    pub raw_json: String,
}

impl CatalogRecord {
    /// Sorted author tuple used for grouping.
    pub fn author_set(&self) -> Vec<String> {
        let mut set = self.authors.clone();
        set.sort();
        set
    }
}

/// Pre-loaded tables for one run.
#[derive(Debug, Default)]
pub struct IdentityInput {
    pub users: Vec<UserRecord>,
    pub orders: Vec<OrderRecord>,
    pub catalog: Vec<CatalogRecord>,
    /// User rows dropped by the loader because their ID was missing.
    pub skipped_user_rows: usize,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Total function from every observed user ID to its canonical ID.
///
/// Built once per run and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMapping {
    canonical: BTreeMap<UserId, UserId>,
}

impl IdentityMapping {
    pub(crate) fn from_map(canonical: BTreeMap<UserId, UserId>) -> Self {
        Self { canonical }
    }

    pub fn canonical(&self, id: &UserId) -> Option<&UserId> {
        self.canonical.get(id)
    }

    /// Canonical ID, or the ID itself when it was never seen.
    pub fn canonical_or_self(&self, id: &UserId) -> UserId {
        self.canonical.get(id).cloned().unwrap_or_else(|| id.clone())
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Entries in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &UserId)> {
        self.canonical.iter()
    }

    /// Members grouped under their canonical ID, both levels sorted.
    pub fn groups(&self) -> BTreeMap<UserId, Vec<UserId>> {
        let mut groups: BTreeMap<UserId, Vec<UserId>> = BTreeMap::new();
        for (id, canonical) in &self.canonical {
            groups.entry(canonical.clone()).or_default().push(id.clone());
        }
        groups
    }

    pub fn entries(&self) -> Vec<MappingEntry> {
        self.canonical
            .iter()
            .map(|(id, canonical)| MappingEntry {
                id: id.clone(),
                canonical_id: canonical.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEntry {
    pub id: UserId,
    pub canonical_id: UserId,
}

/// One connected component, reduced to its real IDs plus the keys that
/// linked them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub canonical_id: UserId,
    pub members: Vec<UserId>,
    pub keys: Vec<MatchKey>,
}

// ---------------------------------------------------------------------------
// Materialized tables
// ---------------------------------------------------------------------------

/// Exact duplicates compare the full source row plus `real_user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedUser {
    #[serde(flatten)]
    pub record: UserRecord,
    pub real_user_id: UserId,
}

/// Order with cleaned price and date, before identity is attached.
#[derive(Debug, Clone, Serialize)]
pub struct PricedOrder {
    #[serde(flatten)]
    pub order: OrderRecord,
    pub paid_price: f64,
    #[serde(skip)]
    pub timestamp_clean: Option<NaiveDateTime>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedOrder {
    #[serde(flatten)]
    pub priced: PricedOrder,
    pub real_user_id: Option<UserId>,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopBuyer {
    pub id: UserId,
    pub spent: f64,
    pub aliases: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub daily_revenue: Vec<DailyRevenue>,
    pub total_revenue: f64,
    pub unique_users: usize,
    pub unique_author_sets: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_buyer: Option<TopBuyer>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub raw_users: usize,
    pub skipped_user_rows: usize,
    pub distinct_users: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
    pub clusters: usize,
    pub merged_users: usize,
    pub largest_cluster: usize,
    pub orders: usize,
    pub orders_resolved: usize,
    pub orders_unresolved: usize,
    pub duplicate_rows_dropped: usize,
    /// Merged clusters that contain a missing-attribute key.
    pub absence_key_clusters: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub missing_attributes: MissingAttributePolicy,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdentityRun {
    pub meta: RunMeta,
    pub summary: RunSummary,
    pub mapping: Vec<MappingEntry>,
    /// Clusters with more than one member, ordered by canonical ID.
    pub clusters: Vec<Cluster>,
    pub metrics: Metrics,
    #[serde(skip)]
    pub users: Vec<ResolvedUser>,
    #[serde(skip)]
    pub orders: Vec<ResolvedOrder>,
}
