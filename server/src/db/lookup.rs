//! Lookup records emulate unique secondary keys. Each one maps a canonical
//! alternate value (a username, an email, a team or conference name) to the
//! id of the entity that owns it.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::Database;
use super::codec::{build_item, describe_key, payload};
use super::keys::{EntityKind, Keys, LookupKind};
use crate::error::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
struct LookupRecord {
    owner_id: String,
    value: String,
}

impl Database {
    /// Reserves `value` for `owner_id`. Fails with `Conflict` when someone
    /// already holds it, including `owner_id` itself.
    pub async fn claim(&self, kind: LookupKind, value: &str, owner_id: &str) -> Result<()> {
        let key = Keys::lookup(kind, value);
        let record = LookupRecord {
            owner_id: owner_id.to_string(),
            value: kind.canonical(value),
        };
        let data = serde_dynamo::to_attribute_value(&record)
            .map_err(|e| Error::corrupt(key.to_string(), e))?;
        let item = build_item(EntityKind::Lookup, &key, &[], data);

        match self.client().put_if_absent(self.table(), item).await {
            Ok(()) => {
                debug!("Claimed {} {} for {}", kind.describe(), record.value, owner_id);
                Ok(())
            }
            Err(Error::Conflict(_)) => Err(Error::conflict(kind.describe())),
            Err(e) => Err(e),
        }
    }

    /// Id of the entity holding `value`, if any.
    pub async fn resolve(&self, kind: LookupKind, value: &str) -> Result<Option<String>> {
        let key = Keys::lookup(kind, value);
        let Some(item) = self.client().get(self.table(), &key).await? else {
            return Ok(None);
        };
        let data = payload(&item).map_err(|reason| Error::corrupt(describe_key(&item), reason))?;
        let record: LookupRecord = serde_dynamo::from_attribute_value(data.clone())
            .map_err(|e| Error::corrupt(describe_key(&item), e))?;
        Ok(Some(record.owner_id))
    }

    /// Drops the lookup for `value`, but only while it still points at
    /// `owner_id`. Missing lookups are fine.
    pub async fn release(&self, kind: LookupKind, value: &str, owner_id: &str) -> Result<()> {
        match self.resolve(kind, value).await? {
            Some(holder) if holder == owner_id => {
                self.delete_key(&Keys::lookup(kind, value)).await?;
                debug!("Released {} {} from {}", kind.describe(), value, owner_id);
            }
            Some(holder) => {
                warn!(
                    "Not releasing {} {}: held by {}, not {}",
                    kind.describe(),
                    value,
                    holder,
                    owner_id
                );
            }
            None => {}
        }
        Ok(())
    }

    /// Moves `owner_id` from `old` to `new`: claims the new value first, then
    /// drops the old lookup. Values equal after canonicalization are a no-op.
    /// Callers hold the owning entity's lock around the whole update.
    pub async fn rename(
        &self,
        kind: LookupKind,
        old: &str,
        new: &str,
        owner_id: &str,
    ) -> Result<()> {
        if kind.canonical(old) == kind.canonical(new) {
            return Ok(());
        }
        self.claim(kind, new, owner_id).await?;
        self.release(kind, old, owner_id).await
    }

    /// Rollback of a `claim` after a later step failed. A failure here is
    /// logged; the caller returns the error that started the rollback.
    pub(crate) async fn undo_claim(&self, kind: LookupKind, value: &str, owner_id: &str) {
        if let Err(e) = self.release(kind, value, owner_id).await {
            error!(
                "Failed to release {} {} of {} during rollback: {}",
                kind.describe(),
                value,
                owner_id,
                e
            );
        }
    }

    /// Rollback of a `rename` from `old` to `new`, logged like `undo_claim`.
    pub(crate) async fn undo_rename(&self, kind: LookupKind, old: &str, new: &str, owner_id: &str) {
        if let Err(e) = self.rename(kind, new, old, owner_id).await {
            error!(
                "Failed to move {} of {} back from {} to {}: {}",
                kind.describe(),
                owner_id,
                new,
                old,
                e
            );
        }
    }
}
