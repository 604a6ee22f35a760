use actix_web::web::{Data, Json};
use actix_web::{get, post, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::AuthUser;
use crate::services::db_utils::AppState;
use crate::services::messages::{AddKbEntry, FetchFlaggedKb, FetchMyKbEntries, ModerateKbEntry, RateKbEntry};
use crate::types::UserType;

#[derive(Deserialize)]
pub struct KbEntryBody {
    pub question: String,
    pub answer: String,
}

#[post("/add/")]
pub async fn add_entry(state: Data<AppState>, auth: AuthUser, body: Json<KbEntryBody>) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Chef, UserType::Delivery])?;

    let entry = state
        .pg_db
        .send(AddKbEntry {
            user_id: auth.id(),
            question: body.question.trim().to_owned(),
            answer: body.answer.trim().to_owned(),
        })
        .await??;

    Ok(HttpResponse::Created().json(json!({
        "message": "Knowledge base entry added",
        "entry": entry,
    })))
}

#[get("/my-entries/")]
pub async fn my_entries(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Chef, UserType::Delivery])?;
    let entries = state.pg_db.send(FetchMyKbEntries(auth.id())).await??;
    Ok(HttpResponse::Ok().json(json!({ "entries": entries })))
}

#[derive(Deserialize)]
pub struct KbRatingBody {
    pub entry_id: i64,
    pub rating: i32,
}

#[post("/rate/")]
pub async fn rate_entry(state: Data<AppState>, auth: AuthUser, body: Json<KbRatingBody>) -> ServiceResult<HttpResponse> {
    let entry = state
        .pg_db
        .send(RateKbEntry {
            user_id: auth.id(),
            entry_id: body.entry_id,
            rating: body.rating,
        })
        .await??;

    let message = if entry.entry.is_flagged {
        "Thanks. The entry was flagged for review."
    } else {
        "Thanks for rating this answer"
    };

    Ok(HttpResponse::Ok().json(json!({ "message": message, "entry": entry })))
}

#[get("/kb/")]
pub async fn flagged_entries(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;
    let entries = state.pg_db.send(FetchFlaggedKb).await??;
    Ok(HttpResponse::Ok().json(entries))
}

#[derive(Deserialize)]
pub struct ModerateBody {
    pub entry_id: i64,
    #[serde(default)]
    pub ban_author: bool,
    pub action: Option<String>,
}

#[post("/manage/")]
pub async fn manage_entry(state: Data<AppState>, auth: AuthUser, body: Json<ModerateBody>) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;

    let remove = match body.action.as_deref().map(str::trim) {
        None | Some("remove") => true,
        Some("restore") => false,
        Some(other) => return Err(ServiceError::bad_request(format!("Unknown action '{other}'"))),
    };

    let entry = state
        .pg_db
        .send(ModerateKbEntry {
            entry_id: body.entry_id,
            remove,
            ban_author: body.ban_author,
        })
        .await??;

    Ok(HttpResponse::Ok().json(json!({
        "message": if remove { "Entry removed" } else { "Entry restored" },
        "entry": entry,
    })))
}
