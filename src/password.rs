use actix_web::web;

use crate::errors::ApiResult;

/// bcrypt wrapper. Work runs on the blocking pool, never on the executor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        PasswordHasher { cost }
    }

    pub async fn hash(&self, password: String) -> ApiResult<String> {
        let cost = self.cost;
        let hashed = web::block(move || bcrypt::hash(password, cost)).await??;
        Ok(hashed)
    }

    /// A hash that cannot be parsed verifies as `false`.
    pub async fn verify(&self, password: String, hash: String) -> ApiResult<bool> {
        let matches =
            web::block(move || bcrypt::verify(password, &hash).unwrap_or(false)).await?;
        Ok(matches)
    }

    /// Synchronous variant for startup, before the server is running.
    pub fn hash_blocking(&self, password: &str) -> ApiResult<String> {
        Ok(bcrypt::hash(password, self.cost)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[actix_web::test]
    async fn hash_and_verify() {
        let hasher = PasswordHasher::new(TEST_COST);
        let hash = hasher.hash("MySuperPassword$1234".into()).await.unwrap();
        assert_ne!(hash, "MySuperPassword$1234");
        assert!(hasher
            .verify("MySuperPassword$1234".into(), hash.clone())
            .await
            .unwrap());
        assert!(!hasher.verify("wrong-password".into(), hash).await.unwrap());
    }

    #[actix_web::test]
    async fn same_password_gets_distinct_salts() {
        let hasher = PasswordHasher::new(TEST_COST);
        let first = hasher.hash("same-password".into()).await.unwrap();
        let second = hasher.hash("same-password".into()).await.unwrap();
        assert_ne!(first, second);
    }

    #[actix_web::test]
    async fn malformed_hash_does_not_verify() {
        let hasher = PasswordHasher::new(TEST_COST);
        assert!(!hasher
            .verify("whatever".into(), "not-a-bcrypt-hash".into())
            .await
            .unwrap());
    }

    #[test]
    fn blocking_hash_verifies() {
        let hasher = PasswordHasher::new(TEST_COST);
        let hash = hasher.hash_blocking("secret").unwrap();
        assert!(bcrypt::verify("secret", &hash).unwrap());
    }
}
