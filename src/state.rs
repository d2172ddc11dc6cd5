use std::sync::Arc;

use crate::auth::{AuthService, TokenIssuer};
use crate::config::Config;
use crate::db::UserStore;
use crate::errors::ApiResult;
use crate::password::PasswordHasher;
use crate::service::UserService;

/// Shared across workers through `web::Data<AppState>`.
pub struct AppState {
    pub auth: AuthService,
    pub users: UserService,
}

impl AppState {
    pub fn new(config: &Config) -> ApiResult<Self> {
        let store = Arc::new(UserStore::new());
        let hasher = PasswordHasher::new(config.bcrypt_cost);
        let issuer = TokenIssuer::new(&config.jwt_secret, config.access_token_ttl);

        let auth = AuthService::new(
            Arc::clone(&store),
            hasher,
            issuer,
            &config.admin_username,
            &config.admin_password,
        )?;
        let users = UserService::new(store, hasher, auth.service_username());

        Ok(AppState { auth, users })
    }
}
