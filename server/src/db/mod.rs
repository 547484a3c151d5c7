pub mod codec;
pub mod dynamodb;
pub mod games;
pub mod keys;
pub mod leagues;
pub mod lookup;
pub mod memory;
pub mod picks;
pub mod queries;
pub mod retry;
pub mod teams;
pub mod users;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use tracing::warn;

use crate::error::{Error, Result};
use crate::locks::KeyLocks;
use codec::Entity;

/// A stored item: a flat map of named attributes.
pub type Item = HashMap<String, AttributeValue>;

pub const PK_ATTR: &str = "PK";
pub const SK_ATTR: &str = "SK";
pub const ENTITY_TYPE_ATTR: &str = "entity_type";
pub const DATA_ATTR: &str = "data";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimaryKey {
    pub pk: String,
    pub sk: String,
}

impl PrimaryKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }
}

impl std::fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.pk, self.sk)
    }
}

/// Secondary indexes of the main table. Each one reads its key from the
/// `<name>_PK` / `<name>_SK` attributes of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    /// Entity kind -> all items of that kind
    Gsi1,
    /// League-week (games, picks), conference (teams), week (leaderboard)
    Gsi2,
    /// Game -> picks, for scoring fan-out
    Gsi3,
    /// Season -> picks
    Gsi4,
}

impl Index {
    pub const ALL: [Index; 4] = [Index::Gsi1, Index::Gsi2, Index::Gsi3, Index::Gsi4];

    pub fn name(&self) -> &'static str {
        match self {
            Index::Gsi1 => "GSI1",
            Index::Gsi2 => "GSI2",
            Index::Gsi3 => "GSI3",
            Index::Gsi4 => "GSI4",
        }
    }

    pub fn pk_attr(&self) -> &'static str {
        match self {
            Index::Gsi1 => "GSI1_PK",
            Index::Gsi2 => "GSI2_PK",
            Index::Gsi3 => "GSI3_PK",
            Index::Gsi4 => "GSI4_PK",
        }
    }

    pub fn sk_attr(&self) -> &'static str {
        match self {
            Index::Gsi1 => "GSI1_SK",
            Index::Gsi2 => "GSI2_SK",
            Index::Gsi3 => "GSI3_SK",
            Index::Gsi4 => "GSI4_SK",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortCondition {
    Equals(String),
    BeginsWith(String),
    /// Inclusive on both ends
    Between(String, String),
    AtLeast(String),
    AtMost(String),
}

impl SortCondition {
    pub fn matches(&self, sk: &str) -> bool {
        match self {
            SortCondition::Equals(v) => sk == v,
            SortCondition::BeginsWith(prefix) => sk.starts_with(prefix.as_str()),
            SortCondition::Between(low, high) => sk >= low.as_str() && sk <= high.as_str(),
            SortCondition::AtLeast(v) => sk >= v.as_str(),
            SortCondition::AtMost(v) => sk <= v.as_str(),
        }
    }
}

/// Equality on a partition plus an optional sort-key condition, against
/// the table itself or one of its indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub index: Option<Index>,
    pub partition: String,
    pub sort: Option<SortCondition>,
}

impl Query {
    pub fn table(partition: impl Into<String>) -> Self {
        Self {
            index: None,
            partition: partition.into(),
            sort: None,
        }
    }

    pub fn index(index: Index, partition: impl Into<String>) -> Self {
        Self {
            index: Some(index),
            partition: partition.into(),
            sort: None,
        }
    }

    pub fn sort(mut self, condition: SortCondition) -> Self {
        self.sort = Some(condition);
        self
    }

    pub fn begins_with(self, prefix: impl Into<String>) -> Self {
        self.sort(SortCondition::BeginsWith(prefix.into()))
    }

    pub fn pk_attr(&self) -> &'static str {
        self.index.map(|i| i.pk_attr()).unwrap_or(PK_ATTR)
    }

    pub fn sk_attr(&self) -> &'static str {
        self.index.map(|i| i.sk_attr()).unwrap_or(SK_ATTR)
    }
}

/// Filter for the full-table scan. Both parts must hold when set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFilter {
    pub entity_type: Option<String>,
    /// (top-level string attribute, substring)
    pub contains: Option<(String, String)>,
}

impl ScanFilter {
    pub fn entity_type(mut self, kind: keys::EntityKind) -> Self {
        self.entity_type = Some(kind.as_str().to_string());
        self
    }

    pub fn contains(mut self, attribute: impl Into<String>, needle: impl Into<String>) -> Self {
        self.contains = Some((attribute.into(), needle.into()));
        self
    }

    pub fn matches(&self, item: &Item) -> bool {
        let string_attr = |name: &str| item.get(name).and_then(|v| v.as_s().ok());
        if let Some(kind) = &self.entity_type {
            if string_attr(ENTITY_TYPE_ATTR) != Some(kind) {
                return false;
            }
        }
        if let Some((attribute, needle)) = &self.contains {
            match string_attr(attribute) {
                Some(value) if value.contains(needle.as_str()) => {}
                _ => return false,
            }
        }
        true
    }
}

/// The storage contract everything above the backend is written against.
///
/// Zero results are never an error; `Error::Backend` is reserved for
/// transport and service failures.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Point lookup on the primary key
    async fn get(&self, table: &str, key: &PrimaryKey) -> Result<Option<Item>>;

    /// Full overwrite, idempotent
    async fn put(&self, table: &str, item: Item) -> Result<()>;

    /// Atomic create; `Error::Conflict` when the primary key is taken
    async fn put_if_absent(&self, table: &str, item: Item) -> Result<()>;

    /// Idempotent; a missing key is not an error
    async fn delete(&self, table: &str, key: &PrimaryKey) -> Result<()>;

    /// All matching items, ordered by the queried sort key
    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Item>>;

    /// Full-table scan. Only for lookups by a non-indexed attribute; cost
    /// grows with the whole table.
    async fn scan(&self, table: &str, filter: Option<&ScanFilter>) -> Result<Vec<Item>>;
}

/// Entity-level access to the single table. The per-entity operations live
/// in the sibling modules (`users`, `teams`, ...).
#[derive(Clone)]
pub struct Database {
    client: Arc<dyn StorageClient>,
    table: String,
    locks: KeyLocks,
}

impl Database {
    pub fn new(client: Arc<dyn StorageClient>, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            locks: KeyLocks::default(),
        }
    }

    pub fn client(&self) -> &dyn StorageClient {
        self.client.as_ref()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn locks(&self) -> &KeyLocks {
        &self.locks
    }

    pub(crate) fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Single required-or-absent item; corrupt data fails the call.
    pub(crate) async fn get_entity<E: Entity>(&self, key: &PrimaryKey) -> Result<Option<E>> {
        match self.client.get(&self.table, key).await? {
            Some(item) => codec::decode::<E>(&item).map(Some),
            None => Ok(None),
        }
    }

    pub(crate) async fn require_entity<E: Entity>(&self, key: &PrimaryKey) -> Result<E> {
        self.get_entity(key)
            .await?
            .ok_or_else(|| Error::not_found(E::KIND.as_str().to_lowercase()))
    }

    pub(crate) async fn put_entity<E: Entity>(&self, entity: &E) -> Result<()> {
        self.client.put(&self.table, codec::encode(entity)?).await
    }

    pub(crate) async fn create_entity<E: Entity>(&self, entity: &E) -> Result<()> {
        self.client
            .put_if_absent(&self.table, codec::encode(entity)?)
            .await
    }

    pub(crate) async fn delete_key(&self, key: &PrimaryKey) -> Result<()> {
        self.client.delete(&self.table, key).await
    }

    /// List query; items that fail to decode are logged and skipped.
    pub(crate) async fn query_entities<E: Entity>(&self, query: &Query) -> Result<Vec<E>> {
        let items = self.client.query(&self.table, query).await?;
        Ok(codec::decode_list(&items))
    }

    pub(crate) async fn scan_entities<E: Entity>(&self, filter: &ScanFilter) -> Result<Vec<E>> {
        warn!(
            "Full table scan of {} for {} items; this does not scale",
            self.table,
            E::KIND
        );
        let items = self.client.scan(&self.table, Some(filter)).await?;
        Ok(codec::decode_list(&items))
    }
}
