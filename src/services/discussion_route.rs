use actix_web::web::{Data, Json, Query};
use actix_web::{get, post, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::ServiceResult;
use crate::services::auth::AuthUser;
use crate::services::db_utils::AppState;
use crate::services::messages::{CreateTopic, FetchDiscussionSummary, FetchTopic, FetchTopics, ReplyToTopic};
use crate::types::TopicType;

#[get("/discussion_board/")]
pub async fn topics(state: Data<AppState>) -> ServiceResult<HttpResponse> {
    let board = state.pg_db.send(FetchTopics).await??;
    Ok(HttpResponse::Ok().json(board))
}

#[derive(Deserialize)]
pub struct TopicBody {
    pub title: String,
    pub body: String,
    pub topic_type: Option<String>,
    pub related_chef_id: Option<i64>,
    pub related_menu_item_id: Option<i64>,
    pub related_delivery_id: Option<i64>,
}

#[post("/discussion_board/")]
pub async fn create_topic(state: Data<AppState>, auth: AuthUser, body: Json<TopicBody>) -> ServiceResult<HttpResponse> {
    let topic_type = match body.topic_type.as_deref() {
        Some(kind) if !kind.trim().is_empty() => kind.parse::<TopicType>()?,
        _ => TopicType::General,
    };
    let body = body.into_inner();

    let created = state
        .pg_db
        .send(CreateTopic {
            author_id: auth.id(),
            title: body.title.trim().to_owned(),
            body: body.body.trim().to_owned(),
            topic_type,
            related_chef_id: body.related_chef_id,
            related_menu_item_id: body.related_menu_item_id,
            related_delivery_id: body.related_delivery_id,
        })
        .await??;

    Ok(HttpResponse::Created().json(json!({
        "message": "Topic created",
        "topic": created,
    })))
}

#[derive(Deserialize)]
pub struct TopicQuery {
    pub post_id: i64,
}

#[get("/topic/")]
pub async fn topic(state: Data<AppState>, query: Query<TopicQuery>) -> ServiceResult<HttpResponse> {
    let thread = state.pg_db.send(FetchTopic(query.post_id)).await??;
    Ok(HttpResponse::Ok().json(thread))
}

#[derive(Deserialize)]
pub struct ReplyBody {
    #[serde(alias = "topic_id")]
    pub post_id: i64,
    pub body: String,
}

#[post("/reply/")]
pub async fn reply(state: Data<AppState>, auth: AuthUser, body: Json<ReplyBody>) -> ServiceResult<HttpResponse> {
    let post = state
        .pg_db
        .send(ReplyToTopic {
            topic_id: body.post_id,
            author_id: auth.id(),
            body: body.body.trim().to_owned(),
        })
        .await??;

    Ok(HttpResponse::Created().json(json!({
        "message": "Reply posted",
        "comment": post,
    })))
}

#[get("/discussions/")]
pub async fn discussion_summary(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;
    let summary = state.pg_db.send(FetchDiscussionSummary).await??;
    Ok(HttpResponse::Ok().json(summary))
}
