use actix_web::web::Data;
use actix_web::{get, HttpResponse};
use tracing::warn;

use crate::error::ServiceResult;
use crate::services::auth::AuthUser;
use crate::services::db_utils::AppState;
use crate::services::messages::FetchMenu;
use crate::services::redis_handling::{get_menu, put_menu};
use crate::services::views::MenuEntry;
use crate::types::UserType;

/// Menu snapshot from redis, rebuilt from the database on a miss.
/// A broken cache never blocks browsing.
async fn active_menu(state: &AppState) -> ServiceResult<Vec<MenuEntry>> {
    match get_menu(&state.redis_db).await {
        Ok(Some(json)) => match serde_json::from_str::<Vec<MenuEntry>>(&json) {
            Ok(menu) => return Ok(menu),
            Err(err) => warn!(error = %err, "Discarding unreadable menu cache"),
        },
        Ok(None) => {}
        Err(err) => warn!(error = %err, "Menu cache unavailable"),
    }

    let menu = state.pg_db.send(FetchMenu).await??;

    match serde_json::to_string(&menu) {
        Ok(json) => {
            if let Err(err) = put_menu(&state.redis_db, &json, state.settings.redis.menu_ttl_secs).await {
                warn!(error = %err, "Unable to cache menu");
            }
        }
        Err(err) => warn!(error = %err, "Unable to serialize menu"),
    }

    Ok(menu)
}

#[get("/browse/")]
pub async fn browse(state: Data<AppState>, auth: Option<AuthUser>) -> ServiceResult<HttpResponse> {
    let is_vip = auth.map(|auth| auth.role() == UserType::Vip).unwrap_or(false);

    let menu: Vec<MenuEntry> = active_menu(&state)
        .await?
        .into_iter()
        .filter(|entry| is_vip || !entry.is_vip_exclusive)
        .collect();

    Ok(HttpResponse::Ok().json(menu))
}
