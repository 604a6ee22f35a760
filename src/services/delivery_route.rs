use actix_web::web::{Data, Json};
use actix_web::{get, post, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::AuthUser;
use crate::services::db_utils::AppState;
use crate::services::messages::{
    DeliveryUpdateStatus, FetchAvailableOrders, FetchMyBids, FetchMyDeliveries, FetchStaffStats, PlaceBid,
};
use crate::types::{dollars_to_cents, OrderStatus, UserType};

#[get("/available/")]
pub async fn available_orders(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Delivery])?;
    let orders = state.pg_db.send(FetchAvailableOrders(auth.id())).await??;
    Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[derive(Deserialize)]
pub struct BidBody {
    #[serde(alias = "order_id")]
    pub order: i64,
    pub bid_amount: f64,
}

#[post("/bid/")]
pub async fn place_bid(state: Data<AppState>, auth: AuthUser, body: Json<BidBody>) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Delivery])?;

    if !body.bid_amount.is_finite() || body.bid_amount <= 0.0 {
        return Err(ServiceError::bad_request("Bid amount must be positive"));
    }

    let bid = state
        .pg_db
        .send(PlaceBid {
            user_id: auth.id(),
            order_id: body.order,
            bid_amount: dollars_to_cents(body.bid_amount),
        })
        .await??;

    Ok(HttpResponse::Created().json(json!({
        "message": "Bid placed",
        "bid": bid,
    })))
}

#[get("/my-bids/")]
pub async fn my_bids(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Delivery])?;
    let bids = state.pg_db.send(FetchMyBids(auth.id())).await??;
    Ok(HttpResponse::Ok().json(json!({ "bids": bids })))
}

#[get("/my-deliveries/")]
pub async fn my_deliveries(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Delivery])?;
    let jobs = state.pg_db.send(FetchMyDeliveries(auth.id())).await??;
    Ok(HttpResponse::Ok().json(jobs))
}

#[derive(Deserialize)]
pub struct DeliveryStatusBody {
    pub order_id: i64,
    #[serde(alias = "status")]
    pub new_status: String,
}

#[post("/update-status/")]
pub async fn update_status(
    state: Data<AppState>,
    auth: AuthUser,
    body: Json<DeliveryStatusBody>,
) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Delivery])?;
    let status: OrderStatus = body.new_status.parse()?;

    let order = state
        .pg_db
        .send(DeliveryUpdateStatus {
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

#[get("/stats/")]
pub async fn delivery_stats(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require(&[UserType::Delivery])?;
    let stats = state.pg_db.send(FetchStaffStats(auth.id())).await??;
    Ok(HttpResponse::Ok().json(json!({ "stats": stats })))
}
