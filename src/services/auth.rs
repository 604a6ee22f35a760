//! Session-backed authentication.
//!
//! A login stores `session:<token>` in redis. Requests carry the token in the
//! `session_id` cookie or as a bearer token; `AuthUser` resolves it back to a
//! user row through the database actor.

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::web::{self, Data};
use actix_web::{FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::error::{ServiceError, ServiceResult};
use crate::services::db_models::User;
use crate::services::db_utils::AppState;
use crate::services::messages::FetchUser;
use crate::services::redis_handling::session_user;
use crate::types::{UserType, SESSION_COOKIE};

pub struct AuthUser {
    pub user: User,
    pub token: String,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn role(&self) -> UserType {
        self.user.role()
    }

    pub fn require(&self, roles: &[UserType]) -> ServiceResult<()> {
        if roles.contains(&self.role()) {
            Ok(())
        } else {
            Err(ServiceError::forbidden("You do not have permission to do this"))
        }
    }

    pub fn require_customer(&self) -> ServiceResult<()> {
        self.require(&[UserType::Registered, UserType::Vip])
    }

    pub fn require_manager(&self) -> ServiceResult<()> {
        self.require(&[UserType::Manager])
    }
}

fn session_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        return Some(cookie.value().to_owned());
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned())
        .filter(|token| !token.is_empty())
}

impl FromRequest for AuthUser {
    type Error = ServiceError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = session_token(req);
        let state = req.app_data::<Data<AppState>>().cloned();

        Box::pin(async move {
            let token = token.ok_or(ServiceError::Unauthorized)?;
            let state = state.ok_or_else(|| ServiceError::Internal("Application state is not configured".into()))?;

            let user_id = session_user(&state.redis_db, &token)
                .await?
                .ok_or(ServiceError::Unauthorized)?;

            let user = match state.pg_db.send(FetchUser(user_id)).await? {
                Ok(user) => user,
                Err(ServiceError::NotFound(_)) => return Err(ServiceError::Unauthorized),
                Err(err) => return Err(err),
            };

            if !user.is_active {
                return Err(ServiceError::forbidden("This account has been deactivated"));
            }

            Ok(AuthUser { user, token })
        })
    }
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};

    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

/// Argon2 is CPU bound, so request handlers hash on the blocking thread pool.
pub async fn hash_in_pool(password: String) -> ServiceResult<String> {
    Ok(web::block(move || hash_password(&password)).await??)
}

pub async fn verify_in_pool(password: String, hash: String) -> ServiceResult<bool> {
    Ok(web::block(move || verify_password(&password, &hash)).await?)
}

#[cfg(test)]
mod tests {
    use actix_web::cookie::Cookie;
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn hashes_verify_and_are_salted() {
        let first = hash_password("secret1").unwrap();
        let second = hash_password("secret1").unwrap();

        assert_ne!(first, second);
        assert!(verify_password("secret1", &first));
        assert!(!verify_password("secret2", &first));
        assert!(!verify_password("secret1", "not a hash"));
    }

    #[actix_web::test]
    async fn pool_hashing_round_trips() {
        let hash = hash_in_pool("secret1".to_owned()).await.unwrap();

        assert!(verify_in_pool("secret1".to_owned(), hash.clone()).await.unwrap());
        assert!(!verify_in_pool("wrong".to_owned(), hash).await.unwrap());
    }

    #[test]
    fn token_from_cookie_or_bearer() {
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, "abc"))
            .to_http_request();
        assert_eq!(session_token(&req).as_deref(), Some("abc"));

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer xyz"))
            .to_http_request();
        assert_eq!(session_token(&req).as_deref(), Some("xyz"));

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic xyz"))
            .to_http_request();
        assert_eq!(session_token(&req), None);
    }
}
