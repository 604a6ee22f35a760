use actix_web::web::{Data, Json};
use actix_web::{get, post, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::AuthUser;
use crate::services::db_utils::AppState;
use crate::services::messages::{FetchOrderHistory, PlaceOrder, RateDelivery, RateFood};
use crate::services::views::CheckoutResult;

#[derive(Deserialize)]
pub struct CartItem {
    #[serde(alias = "id", alias = "dish_id")]
    pub menu_item_id: i64,
    #[serde(default = "one")]
    pub quantity: i32,
}

fn one() -> i32 {
    1
}

#[derive(Deserialize)]
pub struct OrderBody {
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub delivery_address: Option<String>,
}

#[post("/order/")]
pub async fn place_order(state: Data<AppState>, auth: AuthUser, body: Json<OrderBody>) -> ServiceResult<HttpResponse> {
    auth.require_customer()?;
    let body = body.into_inner();

    let placed = state
        .pg_db
        .send(PlaceOrder {
            user_id: auth.id(),
            lines: body.items.iter().map(|item| (item.menu_item_id, item.quantity)).collect(),
            delivery_address: body.delivery_address,
            delivery_fee: state.settings.business.delivery_fee_cents,
        })
        .await?;

    match placed {
        Ok(CheckoutResult::Placed(order)) => Ok(HttpResponse::Created().json(order)),
        Ok(CheckoutResult::Refused { message }) => Err(ServiceError::BadRequest(message)),
        Err(err) => Err(err),
    }
}

#[get("/orders/history/")]
pub async fn order_history(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require_customer()?;
    let orders = state.pg_db.send(FetchOrderHistory(auth.id())).await??;
    Ok(HttpResponse::Ok().json(orders))
}

#[derive(Deserialize)]
pub struct FoodReviewBody {
    #[serde(alias = "order_item_id")]
    pub order_item: i64,
    pub rating: i32,
    pub comment: Option<String>,
}

#[post("/review_food/")]
pub async fn review_food(state: Data<AppState>, auth: AuthUser, body: Json<FoodReviewBody>) -> ServiceResult<HttpResponse> {
    auth.require_customer()?;
    let body = body.into_inner();

    state
        .pg_db
        .send(RateFood {
            user_id: auth.id(),
            order_item_id: body.order_item,
            rating: body.rating,
            comment: body.comment,
        })
        .await??;

    Ok(HttpResponse::Created().json(json!({ "message": "Thanks for rating this dish" })))
}

#[derive(Deserialize)]
pub struct DriverReviewBody {
    #[serde(alias = "order_id")]
    pub order: i64,
    pub rating: i32,
    pub comment: Option<String>,
}

#[post("/review_driver/")]
pub async fn review_driver(
    state: Data<AppState>,
    auth: AuthUser,
    body: Json<DriverReviewBody>,
) -> ServiceResult<HttpResponse> {
    auth.require_customer()?;
    let body = body.into_inner();

    state
        .pg_db
        .send(RateDelivery {
            user_id: auth.id(),
            order_id: body.order,
            rating: body.rating,
            comment: body.comment,
        })
        .await??;

    Ok(HttpResponse::Created().json(json!({ "message": "Thanks for rating your delivery" })))
}
