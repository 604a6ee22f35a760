use actix_web::web::{Data, Json};
use actix_web::{post, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::AuthUser;
use crate::services::db_utils::AppState;
use crate::services::messages::CreditDeposit;
use crate::types::{cents_to_dollars, dollars_to_cents};

const MIN_DEPOSIT_CENTS: i64 = 1_00;
const MAX_DEPOSIT_CENTS: i64 = 10_000_00;

#[derive(Deserialize)]
pub struct CreateDepositBody {
    pub amount: f64,
}

#[post("/create/")]
pub async fn create_deposit(
    state: Data<AppState>,
    auth: AuthUser,
    body: Json<CreateDepositBody>,
) -> ServiceResult<HttpResponse> {
    auth.require_customer()?;

    if !body.amount.is_finite() {
        return Err(ServiceError::bad_request("Invalid amount"));
    }
    let cents = dollars_to_cents(body.amount);
    if !(MIN_DEPOSIT_CENTS..=MAX_DEPOSIT_CENTS).contains(&cents) {
        return Err(ServiceError::bad_request(format!(
            "Deposit must be between ${:.2} and ${:.2}",
            cents_to_dollars(MIN_DEPOSIT_CENTS),
            cents_to_dollars(MAX_DEPOSIT_CENTS)
        )));
    }

    let intent = state.stripe.create_payment_intent(auth.id(), cents).await?;

    Ok(HttpResponse::Ok().json(json!({
        "client_secret": intent.client_secret,
        "payment_intent_id": intent.id,
        "amount": cents_to_dollars(intent.amount),
    })))
}

#[derive(Deserialize)]
pub struct ConfirmDepositBody {
    pub payment_intent_id: String,
}

#[post("/confirm/")]
pub async fn confirm_deposit(
    state: Data<AppState>,
    auth: AuthUser,
    body: Json<ConfirmDepositBody>,
) -> ServiceResult<HttpResponse> {
    auth.require_customer()?;

    let intent = state.stripe.retrieve_payment_intent(body.payment_intent_id.trim()).await?;

    if intent.owner() != Some(auth.id()) {
        warn!(user_id = auth.id(), intent = %intent.id, "Payment intent belongs to another user");
        return Err(ServiceError::forbidden("This payment does not belong to you"));
    }
    if !intent.succeeded() {
        return Err(ServiceError::PaymentRequired(format!(
            "Payment has not succeeded (status: {})",
            intent.status
        )));
    }

    let credited = state
        .pg_db
        .send(CreditDeposit {
            user_id: auth.id(),
            amount: intent.amount,
            payment_intent_id: intent.id,
        })
        .await??;

    Ok(HttpResponse::Ok().json(credited))
}
