use actix_web::web::{Data, Json};
use actix_web::{get, post, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::AuthUser;
use crate::services::db_utils::AppState;
use crate::services::messages::{
    AssignDelivery, CloseAccount, FetchCustomers, FetchPendingAssignments, FetchRegistrations, ProcessRegistration,
    SetBlacklist,
};

#[get("/deliveries/")]
pub async fn pending_deliveries(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;
    let orders = state.pg_db.send(FetchPendingAssignments).await??;
    Ok(HttpResponse::Ok().json(orders))
}

#[derive(Deserialize)]
pub struct AssignBody {
    pub order_id: i64,
    pub bid_id: i64,
    pub justification_memo: Option<String>,
}

#[post("/assign_delivery/")]
pub async fn assign_delivery(state: Data<AppState>, auth: AuthUser, body: Json<AssignBody>) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;
    let body = body.into_inner();

    let assigned = state
        .pg_db
        .send(AssignDelivery {
            manager_id: auth.id(),
            order_id: body.order_id,
            bid_id: body.bid_id,
            justification_memo: body.justification_memo,
        })
        .await??;

    Ok(HttpResponse::Ok().json(assigned))
}

#[get("/customers/")]
pub async fn customers(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;
    let rows = state.pg_db.send(FetchCustomers).await??;
    Ok(HttpResponse::Ok().json(rows))
}

#[derive(Deserialize)]
pub struct CloseAccountBody {
    pub customer_id: i64,
    #[serde(default)]
    pub reason: String,
}

#[post("/account/close/")]
pub async fn close_account(
    state: Data<AppState>,
    auth: AuthUser,
    body: Json<CloseAccountBody>,
) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;
    let body = body.into_inner();

    let closed = state
        .pg_db
        .send(CloseAccount {
            customer_id: body.customer_id,
            reason: body.reason,
        })
        .await??;

    Ok(HttpResponse::Ok().json(closed))
}

#[derive(Deserialize)]
pub struct BlacklistBody {
    pub customer_id: i64,
    pub action: String,
}

#[post("/blacklist/")]
pub async fn blacklist(state: Data<AppState>, auth: AuthUser, body: Json<BlacklistBody>) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;

    let blacklisted = match body.action.trim() {
        "blacklist" => true,
        "unblacklist" => false,
        other => return Err(ServiceError::bad_request(format!("Unknown action '{other}'"))),
    };

    let customer = state
        .pg_db
        .send(SetBlacklist {
            customer_id: body.customer_id,
            blacklisted,
        })
        .await??;

    Ok(HttpResponse::Ok().json(json!({
        "message": if blacklisted { "Customer blacklisted" } else { "Customer removed from the blacklist" },
        "customer": customer,
    })))
}

#[get("/registrations/")]
pub async fn registrations(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;
    let requests = state.pg_db.send(FetchRegistrations).await??;
    Ok(HttpResponse::Ok().json(requests))
}

#[derive(Deserialize)]
pub struct RegistrationDecisionBody {
    pub request_id: i64,
    pub decision: String,
}

#[post("/registration/process/")]
pub async fn process_registration(
    state: Data<AppState>,
    auth: AuthUser,
    body: Json<RegistrationDecisionBody>,
) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;

    let approve = match body.decision.trim() {
        "approved" | "approve" => true,
        "rejected" | "reject" => false,
        other => return Err(ServiceError::bad_request(format!("Unknown decision '{other}'"))),
    };

    let request = state
        .pg_db
        .send(ProcessRegistration {
            request_id: body.request_id,
            approve,
            manager_id: auth.id(),
        })
        .await??;

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Registration of {} {}", request.username, request.status),
        "request": request,
    })))
}
