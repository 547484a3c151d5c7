use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::{Item, PrimaryKey, Query, ScanFilter, StorageClient};
use crate::error::Result;

const BASE_DELAY_MS: u64 = 50;
const MAX_DELAY_MS: u64 = 1000;

/// Retries the idempotent operations (`get`, `put`, `delete`) of the wrapped
/// client on backend errors. Conditional creates, queries and scans pass
/// straight through.
pub struct RetryingStore<S> {
    inner: S,
    max_retries: u32,
    base_delay: Duration,
}

impl<S: StorageClient> RetryingStore<S> {
    pub fn new(inner: S, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(Duration::from_millis(MAX_DELAY_MS).max(self.base_delay))
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt <= self.max_retries => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt = attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Storage {} failed, retrying in {:?}",
                        operation,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<S: StorageClient> StorageClient for RetryingStore<S> {
    async fn get(&self, table: &str, key: &PrimaryKey) -> Result<Option<Item>> {
        self.with_retry("get", || self.inner.get(table, key)).await
    }

    async fn put(&self, table: &str, item: Item) -> Result<()> {
        self.with_retry("put", || self.inner.put(table, item.clone()))
            .await
    }

    async fn put_if_absent(&self, table: &str, item: Item) -> Result<()> {
        self.inner.put_if_absent(table, item).await
    }

    async fn delete(&self, table: &str, key: &PrimaryKey) -> Result<()> {
        self.with_retry("delete", || self.inner.delete(table, key))
            .await
    }

    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Item>> {
        self.inner.query(table, query).await
    }

    async fn scan(&self, table: &str, filter: Option<&ScanFilter>) -> Result<Vec<Item>> {
        self.inner.scan(table, filter).await
    }
}
