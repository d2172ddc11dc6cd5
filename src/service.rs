use std::sync::Arc;

use uuid::Uuid;

use crate::db::{UserChanges, UserStore};
use crate::errors::{ApiError, ApiResult, USERNAME_TAKEN, USER_NOT_FOUND};
use crate::models::{User, UserCreate, UserUpdate};
use crate::password::PasswordHasher;
use crate::validation;

pub const MAX_PAGE_SIZE: usize = 100;

/// CRUD over user records.
pub struct UserService {
    store: Arc<UserStore>,
    hasher: PasswordHasher,
    // The service account name cannot be registered as a regular user.
    reserved_username: String,
}

impl UserService {
    pub fn new(store: Arc<UserStore>, hasher: PasswordHasher, reserved_username: &str) -> Self {
        UserService {
            store,
            hasher,
            reserved_username: reserved_username.to_string(),
        }
    }

    pub async fn create(&self, payload: UserCreate) -> ApiResult<User> {
        let email = validation::email(&payload.email)?;
        let username = validation::username(&payload.username)?;
        validation::password(&payload.password)?;
        let bio = payload.bio.as_deref().map(validation::bio).transpose()?;

        if username == self.reserved_username {
            return Err(ApiError::Conflict(USERNAME_TAKEN.to_string()));
        }

        let password_hash = self.hasher.hash(payload.password).await?;
        let user = self
            .store
            .insert(User::new(username, email, password_hash, bio))
            .await?;
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<User> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))
    }

    pub async fn list(&self, skip: usize, limit: usize) -> Vec<User> {
        self.store.list(skip, limit.clamp(1, MAX_PAGE_SIZE)).await
    }

    /// Partial update: only the fields present in `payload` change.
    pub async fn update(&self, id: Uuid, payload: UserUpdate) -> ApiResult<User> {
        let email = payload.email.as_deref().map(validation::email).transpose()?;
        let username = payload
            .username
            .as_deref()
            .map(validation::username)
            .transpose()?;
        let bio = payload.bio.as_deref().map(validation::bio).transpose()?;
        if let Some(password) = payload.password.as_deref() {
            validation::password(password)?;
        }

        if username.as_deref() == Some(self.reserved_username.as_str()) {
            return Err(ApiError::Conflict(USERNAME_TAKEN.to_string()));
        }

        let password_hash = match payload.password {
            Some(password) => Some(self.hasher.hash(password).await?),
            None => None,
        };

        let user = self
            .store
            .update(
                id,
                UserChanges {
                    username,
                    email,
                    password_hash,
                    bio,
                },
            )
            .await?;
        Ok(user)
    }

    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        self.store.remove(id).await?;
        Ok(())
    }
}
