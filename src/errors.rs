//! Error taxonomy shared by every layer and its mapping onto HTTP responses.
//!
//! Every failure leaves the service as `{"detail": "<message>"}` with the
//! status code of its variant.

use actix_web::error::{
    BlockingError, JsonPayloadError, PathError, QueryPayloadError, UrlencodedError,
};
use actix_web::http::{header, StatusCode};
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::db::StoreError;

/// Convenient result alias for services and handlers.
pub type ApiResult<T> = Result<T, ApiError>;

pub const INVALID_CREDENTIALS: &str = "Incorrect username or password";
pub const INVALID_TOKEN: &str = "Could not validate credentials";
pub const NOT_AUTHENTICATED: &str = "Not authenticated";
pub const USER_NOT_FOUND: &str = "User not found";
pub const USERNAME_TAKEN: &str = "Username already exists";
pub const EMAIL_TAKEN: &str = "Email already exists";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or parameters failed validation.
    #[error("{0}")]
    Validation(String),
    /// A unique field collided with an existing user.
    #[error("{0}")]
    Conflict(String),
    /// Login failed. Unknown usernames and wrong passwords share this variant.
    #[error("Incorrect username or password")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    /// Carries the cause for the logs; clients only see a generic message.
    #[error("Internal server error")]
    Internal(String),
}

/// Wire shape of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(cause) = self {
            error!(cause = %cause, "request failed with internal error");
        }

        let mut builder = HttpResponse::build(self.status_code());
        if self.status_code() == StatusCode::UNAUTHORIZED {
            builder.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
        }
        builder.json(ErrorBody {
            detail: self.to_string(),
        })
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername => ApiError::Conflict(USERNAME_TAKEN.to_string()),
            StoreError::DuplicateEmail => ApiError::Conflict(EMAIL_TAKEN.to_string()),
            StoreError::NotFound => ApiError::NotFound(USER_NOT_FOUND.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ApiError::Internal(format!("password hashing failed: {err}"))
    }
}

impl From<BlockingError> for ApiError {
    fn from(err: BlockingError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ApiError::Internal(format!("token encoding failed: {err}"))
    }
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(err.to_string()).into()
}

pub fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(err.to_string()).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(err.to_string()).into()
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(err.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use rstest::rstest;

    #[rstest]
    #[case(ApiError::Validation("bad".into()), StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(ApiError::Conflict(USERNAME_TAKEN.into()), StatusCode::BAD_REQUEST)]
    #[case(ApiError::InvalidCredentials, StatusCode::UNAUTHORIZED)]
    #[case(ApiError::Unauthorized(INVALID_TOKEN.into()), StatusCode::UNAUTHORIZED)]
    #[case(ApiError::NotFound(USER_NOT_FOUND.into()), StatusCode::NOT_FOUND)]
    #[case(ApiError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn maps_variants_to_status(#[case] err: ApiError, #[case] expected: StatusCode) {
        assert_eq!(err.status_code(), expected);
    }

    #[actix_web::test]
    async fn renders_detail_body() {
        let response = ApiError::Conflict(USERNAME_TAKEN.into()).error_response();
        let body = to_bytes(response.into_body()).await.expect("body");
        let parsed: ErrorBody = serde_json::from_slice(&body).expect("error body");
        assert_eq!(parsed.detail, "Username already exists");
    }

    #[actix_web::test]
    async fn redacts_internal_cause() {
        let response = ApiError::Internal("database password is hunter2".into()).error_response();
        let body = to_bytes(response.into_body()).await.expect("body");
        let parsed: ErrorBody = serde_json::from_slice(&body).expect("error body");
        assert_eq!(parsed.detail, "Internal server error");
    }

    #[test]
    fn unauthorized_carries_bearer_challenge() {
        assert_eq!(ApiError::InvalidCredentials.to_string(), INVALID_CREDENTIALS);
        let response = ApiError::InvalidCredentials.error_response();
        let challenge = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .expect("challenge header");
        assert_eq!(challenge, "Bearer");
    }

    #[test]
    fn store_errors_map_to_api_errors() {
        assert!(matches!(
            ApiError::from(StoreError::DuplicateEmail),
            ApiError::Conflict(msg) if msg == EMAIL_TAKEN
        ));
        assert!(matches!(
            ApiError::from(StoreError::NotFound),
            ApiError::NotFound(msg) if msg == USER_NOT_FOUND
        ));
    }
}
