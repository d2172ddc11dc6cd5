use std::collections::HashMap;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::User;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("username already taken")]
    DuplicateUsername,
    #[error("email already taken")]
    DuplicateEmail,
    #[error("user not found")]
    NotFound,
}

/// Fields to overwrite on an existing user; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub bio: Option<String>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    by_username: HashMap<String, Uuid>,
    // keyed by lowercased address
    by_email: HashMap<String, Uuid>,
}

impl Tables {
    /// Fails if `username` or `email` belongs to someone other than `owner`.
    fn check_unique(&self, owner: Option<Uuid>, username: &str, email: &str) -> Result<(), StoreError> {
        if let Some(id) = self.by_username.get(username) {
            if Some(*id) != owner {
                return Err(StoreError::DuplicateUsername);
            }
        }
        if let Some(id) = self.by_email.get(&email.to_lowercase()) {
            if Some(*id) != owner {
                return Err(StoreError::DuplicateEmail);
            }
        }
        Ok(())
    }
}

/// In-memory credential store.
///
/// Uniqueness checks and writes happen under a single write lock, so two
/// racing inserts for the same username cannot both succeed.
#[derive(Default)]
pub struct UserStore {
    tables: RwLock<Tables>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_unique(None, &user.username, &user.email)?;

        tables.by_username.insert(user.username.clone(), user.id);
        tables.by_email.insert(user.email.to_lowercase(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Option<User> {
        self.tables.read().await.users.get(&id).cloned()
    }

    pub async fn find_by_username(&self, username: &str) -> Option<User> {
        let tables = self.tables.read().await;
        tables
            .by_username
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned()
    }

    /// Users ordered by creation time.
    pub async fn list(&self, skip: usize, limit: usize) -> Vec<User> {
        let tables = self.tables.read().await;
        let mut users: Vec<&User> = tables.users.values().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        users.into_iter().skip(skip).take(limit).cloned().collect()
    }

    pub async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        let current = tables.users.get(&id).ok_or(StoreError::NotFound)?;

        let username = changes.username.unwrap_or_else(|| current.username.clone());
        let email = changes.email.unwrap_or_else(|| current.email.clone());
        tables.check_unique(Some(id), &username, &email)?;

        let old_username = current.username.clone();
        let old_email = current.email.to_lowercase();
        if old_username != username {
            tables.by_username.remove(&old_username);
            tables.by_username.insert(username.clone(), id);
        }
        if old_email != email.to_lowercase() {
            tables.by_email.remove(&old_email);
            tables.by_email.insert(email.to_lowercase(), id);
        }

        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.username = username;
        user.email = email;
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(bio) = changes.bio {
            user.bio = Some(bio);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables.users.remove(&id).ok_or(StoreError::NotFound)?;
        tables.by_username.remove(&user.username);
        tables.by_email.remove(&user.email.to_lowercase());
        Ok(())
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.tables.read().await.users.len()
    }
}
