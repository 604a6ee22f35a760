use actix_web::web::{Data, Json};
use actix_web::{delete, get, post, put, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::AuthUser;
use crate::services::db_utils::AppState;
use crate::services::messages::{
    ChefUpdateStatus, CreateMenuItem, DeleteMenuItem, FetchChefMenu, FetchChefOrders, FetchChefRatings,
    FetchStaffStats, UpdateMenuItem,
};
use crate::services::redis_handling::invalidate_menu;
use crate::types::{dollars_to_cents, OrderStatus, UserType};

pub(crate) async fn refresh_menu(state: &AppState) {
    if let Err(err) = invalidate_menu(&state.redis_db).await {
        warn!(error = %err, "Unable to invalidate menu cache");
    }
}

fn price_in_cents(price: f64) -> ServiceResult<i64> {
    if !price.is_finite() || price <= 0.0 {
        return Err(ServiceError::bad_request("Price must be positive"));
    }
    Ok(dollars_to_cents(price))
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
}

#[get("/menu/")]
pub async fn chef_menu(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Chef])?;
    let items = state.pg_db.send(FetchChefMenu(auth.id())).await??;
    Ok(HttpResponse::Ok().json(items))
}

#[derive(Deserialize)]
pub struct NewItemBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_vip_exclusive: bool,
}

async fn create_item(state: Data<AppState>, auth: AuthUser, body: NewItemBody) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Chef])?;

    let item = state
        .pg_db
        .send(CreateMenuItem {
            chef_user_id: auth.id(),
            name: body.name,
            description: body.description,
            price: price_in_cents(body.price)?,
            image_url: blank_to_none(body.image_url),
            is_vip_exclusive: body.is_vip_exclusive,
        })
        .await??;

    refresh_menu(&state).await;
    Ok(HttpResponse::Created().json(item))
}

#[post("/add_item/")]
pub async fn add_item(state: Data<AppState>, auth: AuthUser, body: Json<NewItemBody>) -> ServiceResult<HttpResponse> {
    create_item(state, auth, body.into_inner()).await
}

#[post("/menu/")]
pub async fn add_menu_item(state: Data<AppState>, auth: AuthUser, body: Json<NewItemBody>) -> ServiceResult<HttpResponse> {
    create_item(state, auth, body.into_inner()).await
}

#[derive(Deserialize)]
pub struct UpdateItemBody {
    pub item_id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub is_vip_exclusive: Option<bool>,
}

#[put("/menu/update/")]
pub async fn update_menu_item(
    state: Data<AppState>,
    auth: AuthUser,
    body: Json<UpdateItemBody>,
) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Chef])?;
    let body = body.into_inner();

    let item = state
        .pg_db
        .send(UpdateMenuItem {
            chef_user_id: auth.id(),
            item_id: body.item_id,
            name: body.name,
            description: body.description,
            price: body.price.map(price_in_cents).transpose()?,
            image_url: blank_to_none(body.image_url),
            is_vip_exclusive: body.is_vip_exclusive,
        })
        .await??;

    refresh_menu(&state).await;
    Ok(HttpResponse::Ok().json(item))
}

#[derive(Deserialize)]
pub struct ItemRef {
    pub item_id: i64,
}

#[delete("/menu/delete/")]
pub async fn delete_menu_item(state: Data<AppState>, auth: AuthUser, body: Json<ItemRef>) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Chef])?;

    state
        .pg_db
        .send(DeleteMenuItem {
            chef_user_id: auth.id(),
            item_id: body.item_id,
        })
        .await??;

    refresh_menu(&state).await;
    Ok(HttpResponse::Ok().json(json!({ "message": "Item removed from the menu" })))
}

#[get("/orders/")]
pub async fn chef_orders(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Chef])?;
    let board = state.pg_db.send(FetchChefOrders(auth.id())).await??;
    Ok(HttpResponse::Ok().json(board))
}

#[derive(Deserialize)]
pub struct StatusBody {
    pub order_id: i64,
    pub status: String,
}

#[post("/orders/update-status/")]
pub async fn chef_update_status(
    state: Data<AppState>,
    auth: AuthUser,
    body: Json<StatusBody>,
) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Chef])?;
    let status: OrderStatus = body.status.parse()?;

    let order = state
        .pg_db
        .send(ChefUpdateStatus {
            user_id: auth.id(),
            order_id: body.order_id,
            status,
        })
        .await??;

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Order #{} is now {}", order.id, status.label()),
        "order": order,
    })))
}

#[get("/ratings/")]
pub async fn chef_ratings(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Chef])?;
    let ratings = state.pg_db.send(FetchChefRatings(auth.id())).await??;
    Ok(HttpResponse::Ok().json(ratings))
}

#[get("/stats/")]
pub async fn chef_stats(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Chef])?;
    let stats = state.pg_db.send(FetchStaffStats(auth.id())).await??;
    Ok(HttpResponse::Ok().json(stats))
}
