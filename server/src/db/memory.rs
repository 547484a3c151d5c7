use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::codec::item_key;
use super::{Item, PrimaryKey, Query, ScanFilter, StorageClient};
use crate::error::{Error, Result};

type Table = BTreeMap<PrimaryKey, Item>;

/// In-process `StorageClient`. Items are ordered by (PK, SK), so table
/// queries come back in sort-key order without extra work; index queries
/// filter on the `GSIn_*` attributes and sort.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items in `table`, for tests and diagnostics
    pub async fn len(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.len())
            .unwrap_or(0)
    }

    pub async fn is_empty(&self, table: &str) -> bool {
        self.len(table).await == 0
    }
}

fn string_attr<'a>(item: &'a Item, name: &str) -> Option<&'a str> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .map(String::as_str)
}

fn key_of(item: &Item) -> Result<PrimaryKey> {
    item_key(item).ok_or_else(|| Error::validation("item", "PK and SK must be string attributes"))
}

#[async_trait]
impl StorageClient for MemoryStore {
    async fn get(&self, table: &str, key: &PrimaryKey) -> Result<Option<Item>> {
        let tables = self.tables.read().await;
        Ok(tables.get(table).and_then(|t| t.get(key)).cloned())
    }

    async fn put(&self, table: &str, item: Item) -> Result<()> {
        let key = key_of(&item)?;
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().insert(key, item);
        Ok(())
    }

    async fn put_if_absent(&self, table: &str, item: Item) -> Result<()> {
        let key = key_of(&item)?;
        let mut tables = self.tables.write().await;
        let table = tables.entry(table.to_string()).or_default();
        if table.contains_key(&key) {
            return Err(Error::conflict("item"));
        }
        table.insert(key, item);
        Ok(())
    }

    async fn delete(&self, table: &str, key: &PrimaryKey) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(table) = tables.get_mut(table) {
            table.remove(key);
        }
        Ok(())
    }

    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Item>> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(table) else {
            return Ok(Vec::new());
        };
        let sort_matches = |sk: &str| query.sort.as_ref().map_or(true, |c| c.matches(sk));

        match query.index {
            None => {
                let start = PrimaryKey::new(query.partition.as_str(), "");
                Ok(table
                    .range(start..)
                    .take_while(|(key, _)| key.pk == query.partition)
                    .filter(|(key, _)| sort_matches(&key.sk))
                    .map(|(_, item)| item.clone())
                    .collect())
            }
            Some(index) => {
                let mut hits: Vec<(&str, &PrimaryKey, &Item)> = table
                    .iter()
                    .filter_map(|(key, item)| {
                        let pk = string_attr(item, index.pk_attr())?;
                        let sk = string_attr(item, index.sk_attr())?;
                        (pk == query.partition && sort_matches(sk)).then_some((sk, key, item))
                    })
                    .collect();
                // Index sort keys need not be unique; break ties on the table key
                hits.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.cmp(b.1)));
                Ok(hits.into_iter().map(|(_, _, item)| item.clone()).collect())
            }
        }
    }

    async fn scan(&self, table: &str, filter: Option<&ScanFilter>) -> Result<Vec<Item>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map(|t| {
                t.values()
                    .filter(|item| filter.map_or(true, |f| f.matches(item)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
