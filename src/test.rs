mod pg;

use actix::SyncArbiter;
use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{test, App};
use diesel::r2d2::{ConnectionManager, Pool};
use serde_json::json;

use crate::api_scope;
use crate::config::Settings;
use crate::services::db_utils::{AppState, PgActor};
use crate::services::stripe::StripeClient;

// Nothing here reaches Postgres or Redis: the pool is built unchecked and every
// request is rejected before a connection would be needed.
fn offline_state() -> Data<AppState> {
    let settings = Settings::load().unwrap();
    let pool = Pool::builder()
        .max_size(1)
        .build_unchecked(ConnectionManager::new("postgres://localhost/unused"));

    Data::new(AppState {
        pg_db: SyncArbiter::start(1, move || PgActor(pool.clone())),
        redis_db: redis::Client::open("redis://127.0.0.1/").unwrap(),
        stripe: StripeClient::new(settings.stripe.clone()),
        settings,
    })
}

macro_rules! service {
    () => {
        test::init_service(
            App::new()
                .app_data(offline_state())
                .service(crate::services::home_page)
                .service(api_scope()),
        )
        .await
    };
}

#[actix_web::test]
async fn healthcheck_responds() {
    let app = service!();
    let req = test::TestRequest::get().uri("/api/test/healthcheck").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, "I'm alive!");
}

#[actix_web::test]
async fn protected_routes_require_a_session() {
    let app = service!();

    for uri in ["/api/profile/", "/api/orders/history/", "/api/manager/customers/", "/api/kb/my-entries/"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[actix_web::test]
async fn unauthorized_body_carries_error_message() {
    let app = service!();
    let req = test::TestRequest::post()
        .uri("/api/deposit/create/")
        .set_json(json!({ "amount": 25.0 }))
        .to_request();

    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["error"], "Authentication required");
}

#[actix_web::test]
async fn registration_is_validated_before_storage() {
    let app = service!();
    let req = test::TestRequest::post()
        .uri("/api/register/")
        .set_json(json!({ "username": "al", "email": "al@example.com", "password": "secret1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/registration/request/")
        .set_json(json!({ "username": "alice", "email": "not-an-email", "password": "secret1" }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["error"], "Please enter a valid email address");
}

#[actix_web::test]
async fn empty_chat_message_is_rejected() {
    let app = service!();
    let req = test::TestRequest::post()
        .uri("/api/chat/")
        .set_json(json!({ "message": "   " }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn home_page_is_served() {
    let app = service!();
    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn new_topic_requires_a_session() {
    let app = service!();
    let req = test::TestRequest::post()
        .uri("/api/discussion_board/")
        .set_json(json!({ "title": "Best tagine?", "body": "Asking for a friend", "topic_type": "general" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
