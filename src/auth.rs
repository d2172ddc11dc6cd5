use std::sync::Arc;

use actix_web::{dev::ServiceRequest, web, Error, HttpMessage};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::UserStore;
use crate::errors::{ApiError, ApiResult, INVALID_TOKEN, NOT_AUTHENTICATED};
use crate::models::{Claims, Principal, PrincipalKind};
use crate::password::PasswordHasher;
use crate::state::AppState;

/// Issues and verifies HS256 access tokens. Keys are derived once at startup.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        TokenIssuer {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, principal: &Principal) -> ApiResult<String> {
        let now = Utc::now();
        let (sub, kind) = match principal {
            Principal::User(id) => (id.to_string(), PrincipalKind::User),
            Principal::Service(name) => (name.clone(), PrincipalKind::Service),
        };
        let claims = Claims {
            sub,
            kind,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    pub fn verify(&self, token: &str) -> ApiResult<Principal> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                debug!(error = %err, "rejected bearer token");
                unauthorized()
            })?;

        match claims.kind {
            PrincipalKind::User => Uuid::parse_str(&claims.sub)
                .map(Principal::User)
                .map_err(|_| unauthorized()),
            PrincipalKind::Service => Ok(Principal::Service(claims.sub)),
        }
    }
}

fn unauthorized() -> ApiError {
    ApiError::Unauthorized(INVALID_TOKEN.to_string())
}

/// Credentials of the built-in service account.
struct ServiceAccount {
    username: String,
    password_hash: String,
}

/// Orchestrates login and bearer-token authorization.
pub struct AuthService {
    store: Arc<UserStore>,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
    service_account: ServiceAccount,
    // Verified against when the username is unknown, so both failure paths cost one bcrypt run.
    dummy_hash: String,
}

impl AuthService {
    /// Hashes the service account password up front; call before serving traffic.
    pub fn new(
        store: Arc<UserStore>,
        hasher: PasswordHasher,
        issuer: TokenIssuer,
        admin_username: &str,
        admin_password: &str,
    ) -> ApiResult<Self> {
        Ok(AuthService {
            store,
            hasher,
            issuer,
            service_account: ServiceAccount {
                username: admin_username.to_string(),
                password_hash: hasher.hash_blocking(admin_password)?,
            },
            dummy_hash: hasher.hash_blocking("not-a-real-password")?,
        })
    }

    pub fn service_username(&self) -> &str {
        &self.service_account.username
    }

    /// Checks credentials and issues an access token.
    ///
    /// Unknown usernames and wrong passwords both fail with
    /// [`ApiError::InvalidCredentials`]. The username is trimmed the same
    /// way registration trims it.
    pub async fn authenticate(&self, username: &str, password: &str) -> ApiResult<String> {
        let username = username.trim();
        let principal = self.check_credentials(username, password).await?;
        debug!(principal = %principal, "credentials accepted");
        self.issuer.issue(&principal)
    }

    async fn check_credentials(&self, username: &str, password: &str) -> ApiResult<Principal> {
        if username == self.service_account.username {
            let matches = self
                .hasher
                .verify(password.to_string(), self.service_account.password_hash.clone())
                .await?;
            return if matches {
                Ok(Principal::Service(username.to_string()))
            } else {
                warn!(username = %username, "failed service account login");
                Err(ApiError::InvalidCredentials)
            };
        }

        let (hash, id) = match self.store.find_by_username(username).await {
            Some(user) => (user.password_hash, Some(user.id)),
            None => (self.dummy_hash.clone(), None),
        };
        let matches = self.hasher.verify(password.to_string(), hash).await?;

        match id {
            Some(id) if matches => Ok(Principal::User(id)),
            _ => {
                warn!(username = %username, "failed login");
                Err(ApiError::InvalidCredentials)
            }
        }
    }

    /// Resolves a bearer token to its principal.
    pub fn authorize(&self, token: &str) -> ApiResult<Principal> {
        self.issuer.verify(token)
    }
}

/// Bearer validator for `HttpAuthentication::with_fn`.
///
/// A missing or non-bearer `Authorization` header is rejected with
/// `Not authenticated`; an invalid token with `Could not validate credentials`.
/// Stores the resolved [`Principal`] in the request extensions so handlers
/// can take it as `web::ReqData<Principal>`.
pub async fn validator(
    req: ServiceRequest,
    credentials: Option<BearerAuth>,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let Some(credentials) = credentials else {
        return Err((
            ApiError::Unauthorized(NOT_AUTHENTICATED.to_string()).into(),
            req,
        ));
    };

    let state = req.app_data::<web::Data<AppState>>().cloned();
    let Some(state) = state else {
        return Err((
            ApiError::Internal("application state is not registered".to_string()).into(),
            req,
        ));
    };

    match state.auth.authorize(credentials.token()) {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            Ok(req)
        }
        Err(err) => Err((err.into(), req)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    const SECRET: &str = "test-jwt-secret";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, Duration::minutes(30))
    }

    async fn auth_with_user(username: &str, password: &str) -> (AuthService, Uuid) {
        let hasher = PasswordHasher::new(4);
        let store = Arc::new(UserStore::new());
        let hash = hasher.hash(password.to_string()).await.unwrap();
        let user = store
            .insert(User::new(
                username.to_string(),
                format!("{username}@example.com"),
                hash,
                None,
            ))
            .await
            .unwrap();
        let auth = AuthService::new(store, hasher, issuer(), "admin", "secret").unwrap();
        (auth, user.id)
    }

    #[test]
    fn token_round_trips_principal() {
        let id = Uuid::new_v4();
        let issuer = issuer();
        let token = issuer.issue(&Principal::User(id)).unwrap();
        assert_eq!(issuer.verify(&token).unwrap(), Principal::User(id));

        let token = issuer.issue(&Principal::Service("admin".into())).unwrap();
        assert_eq!(
            issuer.verify(&token).unwrap(),
            Principal::Service("admin".into())
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issuer().issue(&Principal::User(Uuid::new_v4())).unwrap();
        let other = TokenIssuer::new("another-secret", Duration::minutes(30));
        assert!(matches!(other.verify(&token), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let expired = TokenIssuer::new(SECRET, Duration::minutes(-5));
        let token = expired.issue(&Principal::User(Uuid::new_v4())).unwrap();
        assert!(matches!(issuer().verify(&token), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(matches!(
            issuer().verify("not.a.jwt"),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn user_subject_must_be_uuid() {
        let claims = Claims {
            sub: "not-a-uuid".into(),
            kind: PrincipalKind::User,
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::minutes(5)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(matches!(issuer().verify(&token), Err(ApiError::Unauthorized(_))));
    }

    #[actix_web::test]
    async fn authenticate_user_and_authorize_token() {
        let (auth, id) = auth_with_user("ada", "MySuperPassword$1234").await;
        let token = auth.authenticate("ada", "MySuperPassword$1234").await.unwrap();
        assert_eq!(auth.authorize(&token).unwrap(), Principal::User(id));
    }

    #[actix_web::test]
    async fn authenticate_service_account() {
        let (auth, _) = auth_with_user("ada", "MySuperPassword$1234").await;
        let token = auth.authenticate("admin", "secret").await.unwrap();
        assert_eq!(
            auth.authorize(&token).unwrap(),
            Principal::Service("admin".into())
        );
        assert!(matches!(
            auth.authenticate("admin", "wrong").await,
            Err(ApiError::InvalidCredentials)
        ));
    }

    #[actix_web::test]
    async fn authenticate_trims_username() {
        let (auth, id) = auth_with_user("ada", "MySuperPassword$1234").await;
        let token = auth
            .authenticate("  ada ", "MySuperPassword$1234")
            .await
            .unwrap();
        assert_eq!(auth.authorize(&token).unwrap(), Principal::User(id));
    }

    #[actix_web::test]
    async fn unknown_user_and_wrong_password_look_identical() {
        let (auth, _) = auth_with_user("ada", "MySuperPassword$1234").await;
        let wrong_password = auth
            .authenticate("ada", "IncorrectPassword123!")
            .await
            .unwrap_err();
        let unknown_user = auth
            .authenticate("nonexistentuser", "DoesNotMatter123!")
            .await
            .unwrap_err();
        assert!(matches!(wrong_password, ApiError::InvalidCredentials));
        assert!(matches!(unknown_user, ApiError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }
}
