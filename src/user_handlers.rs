use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use actix_web_httpauth::middleware::HttpAuthentication;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::auth::validator;
use crate::errors::{self, ApiResult};
use crate::models::{
    ListQuery, LoginRequest, Principal, TokenResponse, UserCreate, UserResponse, UserUpdate,
};
use crate::state::AppState;

/// Registers the full route table plus extractor error handlers.
///
/// ```text
/// POST   /token        form login, no auth
/// POST   /login/       json login, no auth
/// POST   /register/    self-service sign-up, no auth
/// GET    /health
/// POST   /users/       bearer
/// GET    /users/       bearer
/// GET    /users/{id}   bearer
/// PUT    /users/{id}   bearer
/// DELETE /users/{id}   bearer
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(errors::json_error_handler))
        .app_data(web::FormConfig::default().error_handler(errors::form_error_handler))
        .app_data(web::QueryConfig::default().error_handler(errors::query_error_handler))
        .app_data(web::PathConfig::default().error_handler(errors::path_error_handler))
        .service(health)
        .service(token)
        .service(login)
        .service(register)
        .service(
            web::scope("/users")
                .wrap(HttpAuthentication::with_fn(validator))
                .service(create_user)
                .service(list_users)
                .service(get_user)
                .service(update_user)
                .service(delete_user),
        );
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// OAuth2-style password grant using a URL-encoded form.
#[post("/token")]
pub async fn token(
    state: web::Data<AppState>,
    form: web::Form<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let access_token = state.auth.authenticate(&form.username, &form.password).await?;
    Ok(HttpResponse::Ok().json(TokenResponse::bearer(access_token)))
}

#[post("/login/")]
pub async fn login(
    state: web::Data<AppState>,
    data: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let access_token = state.auth.authenticate(&data.username, &data.password).await?;
    Ok(HttpResponse::Ok().json(TokenResponse::bearer(access_token)))
}

#[post("/register/")]
pub async fn register(
    state: web::Data<AppState>,
    payload: web::Json<UserCreate>,
) -> ApiResult<HttpResponse> {
    let user = state.users.create(payload.into_inner()).await?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

#[post("/")]
pub async fn create_user(
    state: web::Data<AppState>,
    principal: web::ReqData<Principal>,
    payload: web::Json<UserCreate>,
) -> ApiResult<HttpResponse> {
    let user = state.users.create(payload.into_inner()).await?;
    let actor = principal.into_inner();
    info!(actor = %actor, user_id = %user.id, "user created");
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

#[get("/")]
pub async fn list_users(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let users: Vec<UserResponse> = state
        .users
        .list(query.skip, query.limit)
        .await
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

#[get("/{id}")]
pub async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let user = state.users.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[put("/{id}")]
pub async fn update_user(
    state: web::Data<AppState>,
    principal: web::ReqData<Principal>,
    path: web::Path<Uuid>,
    payload: web::Json<UserUpdate>,
) -> ApiResult<HttpResponse> {
    let user = state
        .users
        .update(path.into_inner(), payload.into_inner())
        .await?;
    let actor = principal.into_inner();
    info!(actor = %actor, user_id = %user.id, "user updated");
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[delete("/{id}")]
pub async fn delete_user(
    state: web::Data<AppState>,
    principal: web::ReqData<Principal>,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    state.users.delete(id).await?;
    let actor = principal.into_inner();
    info!(actor = %actor, user_id = %id, "user deleted");
    Ok(HttpResponse::NoContent().finish())
}
