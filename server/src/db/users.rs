use chrono::Utc;
use pickem_common::{NewUser, User, UserChanges, normalize_email, validate_email, validate_username};
use tracing::{debug, info, warn};

use super::Database;
use super::codec::item_key;
use super::keys::{EntityKind, Keys, LookupKind};
use super::{Index, Query};
use crate::error::{Error, Result};

fn check_username(username: &str) -> Result<()> {
    let errors = validate_username(username);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::validation("username", errors.join("; ")))
    }
}

fn check_email(email: &str) -> Result<()> {
    match validate_email(email) {
        Some(message) => Err(Error::validation("email", message)),
        None => Ok(()),
    }
}

impl Database {
    /// Creates the user after claiming its username and email. Claims are
    /// rolled back when a later step fails.
    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        check_username(&new_user.username)?;
        check_email(&new_user.email)?;

        let now = Utc::now();
        let user = User {
            id: Self::new_id(),
            username: new_user.username,
            email: normalize_email(&new_user.email),
            display_name: new_user.display_name,
            password_hash: new_user.password_hash,
            is_admin: new_user.is_admin,
            created_at: now,
            updated_at: now,
        };

        self.claim(LookupKind::Username, &user.username, &user.id)
            .await?;
        if let Err(e) = self.claim(LookupKind::Email, &user.email, &user.id).await {
            self.undo_claim(LookupKind::Username, &user.username, &user.id)
                .await;
            return Err(e);
        }
        if let Err(e) = self.create_entity(&user).await {
            warn!("Failed to write user {}, releasing its claims: {}", user.id, e);
            self.undo_claim(LookupKind::Username, &user.username, &user.id)
                .await;
            self.undo_claim(LookupKind::Email, &user.email, &user.id)
                .await;
            return Err(e);
        }

        info!("Created user {} ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.require_entity(&Keys::user(user_id)).await
    }

    pub async fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        self.get_entity(&Keys::user(user_id)).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<User> {
        self.user_by_lookup(LookupKind::Username, username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.user_by_lookup(LookupKind::Email, email).await
    }

    async fn user_by_lookup(&self, kind: LookupKind, value: &str) -> Result<User> {
        let user_id = self
            .resolve(kind, value)
            .await?
            .ok_or_else(|| Error::not_found("user"))?;
        match self.find_user(&user_id).await? {
            Some(user) => Ok(user),
            None => {
                warn!(
                    "{} lookup {} points at missing user {}",
                    kind.describe(),
                    value,
                    user_id
                );
                Err(Error::not_found("user"))
            }
        }
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.query_entities(&Query::index(Index::Gsi1, EntityKind::User.as_str()))
            .await
    }

    /// Applies profile changes. Username and email changes move their
    /// lookup records; the whole update holds the user's lock.
    pub async fn update_user(&self, user_id: &str, changes: UserChanges) -> Result<User> {
        let _guard = self.locks().lock(Keys::user(user_id).to_string()).await;
        let mut user = self.get_user(user_id).await?;

        let username = changes.username.unwrap_or_else(|| user.username.clone());
        let email = changes
            .email
            .map(|e| normalize_email(&e))
            .unwrap_or_else(|| user.email.clone());
        check_username(&username)?;
        check_email(&email)?;

        self.rename(LookupKind::Username, &user.username, &username, user_id)
            .await?;
        if let Err(e) = self
            .rename(LookupKind::Email, &user.email, &email, user_id)
            .await
        {
            self.undo_rename(LookupKind::Username, &user.username, &username, user_id)
                .await;
            return Err(e);
        }

        let previous = user.clone();
        user.username = username;
        user.email = email;
        if let Some(display_name) = changes.display_name {
            user.display_name = display_name;
        }
        user.updated_at = Utc::now();
        if let Err(e) = self.put_entity(&user).await {
            warn!("Failed to write user {}, restoring its lookups: {}", user_id, e);
            self.undo_rename(LookupKind::Email, &previous.email, &user.email, user_id)
                .await;
            self.undo_rename(LookupKind::Username, &previous.username, &user.username, user_id)
                .await;
            return Err(e);
        }

        debug!("Updated user {}", user_id);
        Ok(user)
    }

    /// Deletes the user's partition (profile, picks, cached standings) and
    /// releases the username and email.
    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        let _guard = self.locks().lock(Keys::user(user_id).to_string()).await;
        let user = self.get_user(user_id).await?;

        let items = self
            .client()
            .query(self.table(), &Query::table(Keys::user_partition(user_id)))
            .await?;
        for key in items.iter().filter_map(item_key) {
            self.delete_key(&key).await?;
        }

        self.release(LookupKind::Username, &user.username, user_id)
            .await?;
        self.release(LookupKind::Email, &user.email, user_id).await?;

        info!("Deleted user {} and {} items", user_id, items.len());
        Ok(())
    }
}
