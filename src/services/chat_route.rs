use actix_web::web::{Data, Json};
use actix_web::{post, HttpResponse};
use serde::Deserialize;
use tracing::debug;

use crate::chatbot;
use crate::error::{ServiceError, ServiceResult};
use crate::services::db_utils::AppState;
use crate::services::messages::FetchKnowledge;

#[derive(Deserialize)]
pub struct ChatBody {
    pub message: String,
}

#[post("/chat/")]
pub async fn chat(state: Data<AppState>, body: Json<ChatBody>) -> ServiceResult<HttpResponse> {
    let message = body.message.trim();
    if message.is_empty() {
        return Err(ServiceError::bad_request("Message cannot be empty"));
    }

    let knowledge = state.pg_db.send(FetchKnowledge).await??;
    let reply = chatbot::answer(message, &knowledge);

    debug!(entry = ?reply.entry_id, confidence = reply.confidence, "Chat answered");
    Ok(HttpResponse::Ok().json(reply))
}
