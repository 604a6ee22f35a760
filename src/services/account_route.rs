use actix_web::cookie::{Cookie, SameSite};
use actix_web::web::{Data, Json};
use actix_web::{get, post, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::rules::validate_registration;
use crate::services::auth::{hash_in_pool, verify_in_pool, AuthUser};
use crate::services::db_utils::AppState;
use crate::services::messages::{FetchProfile, FetchUserByUsername, SubmitRegistration};
use crate::services::redis_handling::{create_session, delete_session};
use crate::services::views::SessionUser;
use crate::types::SESSION_COOKIE;

#[derive(Deserialize)]
pub struct LoginBody {
    pub username: String,
    pub password: String,
}

#[post("/login/")]
pub async fn login(state: Data<AppState>, body: Json<LoginBody>) -> ServiceResult<HttpResponse> {
    let user = state
        .pg_db
        .send(FetchUserByUsername(body.username.clone()))
        .await??;

    if !verify_in_pool(body.password.clone(), user.password_hash.clone()).await? {
        warn!(username = %body.username, "Failed login attempt");
        return Err(ServiceError::Unauthorized);
    }
    if !user.is_active {
        return Err(ServiceError::forbidden("This account has been deactivated"));
    }

    let token = create_session(&state.redis_db, user.id, state.settings.redis.session_ttl_secs).await?;
    let cookie = Cookie::build(SESSION_COOKIE, token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();

    info!(user_id = user.id, "User logged in");
    Ok(HttpResponse::Ok().cookie(cookie).json(json!({
        "message": "Login successful",
        "token": token,
        "user": SessionUser::from(&user),
    })))
}

#[post("/logout/")]
pub async fn logout(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    delete_session(&state.redis_db, &auth.token).await?;

    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({ "message": "Logged out" })))
}

#[get("/profile/")]
pub async fn profile(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    let view = state.pg_db.send(FetchProfile(auth.id())).await??;
    Ok(HttpResponse::Ok().json(view))
}

#[derive(Deserialize)]
pub struct RegistrationBody {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

async fn submit_registration(state: Data<AppState>, body: RegistrationBody) -> ServiceResult<HttpResponse> {
    validate_registration(&body.username, &body.email, &body.password)?;
    let password_hash = hash_in_pool(body.password.clone()).await?;

    let request = state
        .pg_db
        .send(SubmitRegistration {
            username: body.username.trim().to_owned(),
            email: body.email.trim().to_lowercase(),
            first_name: body.first_name.trim().to_owned(),
            last_name: body.last_name.trim().to_owned(),
            password_hash,
        })
        .await??;

    Ok(HttpResponse::Created().json(json!({
        "message": "Registration request submitted. A manager will review it shortly.",
        "request_id": request.id,
    })))
}

#[post("/registration/request/")]
pub async fn request_registration(state: Data<AppState>, body: Json<RegistrationBody>) -> ServiceResult<HttpResponse> {
    submit_registration(state, body.into_inner()).await
}

#[post("/register/")]
pub async fn register(state: Data<AppState>, body: Json<RegistrationBody>) -> ServiceResult<HttpResponse> {
    submit_registration(state, body.into_inner()).await
}
