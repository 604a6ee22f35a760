use actix_web::web::{Data, Json};
use actix_web::{get, post, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::AuthUser;
use crate::services::db_utils::AppState;
use crate::services::messages::{
    DisputeComplaint, FeedbackTarget, FetchComplaints, FetchCompliments, FetchFeedbackTargets, FetchMyFeedback,
    FileComplaint, FileCompliment, ProcessComplaint, ProcessCompliment,
};
use crate::types::TargetType;

#[get("/feedback-targets/")]
pub async fn feedback_targets(state: Data<AppState>, _auth: AuthUser) -> ServiceResult<HttpResponse> {
    let targets = state.pg_db.send(FetchFeedbackTargets).await??;
    Ok(HttpResponse::Ok().json(targets))
}

#[derive(Deserialize)]
pub struct FeedbackBody {
    pub target_type: String,
    pub description: String,
    pub chef_id: Option<i64>,
    pub delivery_id: Option<i64>,
    pub customer_username: Option<String>,
    pub order_id: Option<i64>,
}

impl FeedbackBody {
    fn target(&self) -> ServiceResult<FeedbackTarget> {
        let missing = || ServiceError::bad_request("Please select a person");

        match self.target_type.parse::<TargetType>()? {
            TargetType::Chef => Ok(FeedbackTarget::Employee(TargetType::Chef, self.chef_id.ok_or_else(missing)?)),
            TargetType::Delivery => Ok(FeedbackTarget::Employee(
                TargetType::Delivery,
                self.delivery_id.ok_or_else(missing)?,
            )),
            TargetType::Customer => self
                .customer_username
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| FeedbackTarget::Customer(name.to_owned()))
                .ok_or_else(missing),
        }
    }
}

#[post("/complaint/")]
pub async fn file_complaint(state: Data<AppState>, auth: AuthUser, body: Json<FeedbackBody>) -> ServiceResult<HttpResponse> {
    let target = body.target()?;
    let body = body.into_inner();

    let complaint = state
        .pg_db
        .send(FileComplaint {
            author_id: auth.id(),
            target,
            order_id: body.order_id,
            description: body.description,
        })
        .await??;

    Ok(HttpResponse::Created().json(json!({
        "message": "Complaint submitted for review",
        "complaint": complaint,
    })))
}

#[post("/compliment/")]
pub async fn file_compliment(
    state: Data<AppState>,
    auth: AuthUser,
    body: Json<FeedbackBody>,
) -> ServiceResult<HttpResponse> {
    let target = body.target()?;
    let body = body.into_inner();

    let compliment = state
        .pg_db
        .send(FileCompliment {
            author_id: auth.id(),
            target,
            order_id: body.order_id,
            description: body.description,
        })
        .await??;

    Ok(HttpResponse::Created().json(json!({
        "message": "Compliment submitted for review",
        "compliment": compliment,
    })))
}

#[derive(Deserialize)]
pub struct DisputeBody {
    pub complaint_id: i64,
    pub reason: Option<String>,
}

#[post("/complaint/dispute/")]
pub async fn dispute_complaint(
    state: Data<AppState>,
    auth: AuthUser,
    body: Json<DisputeBody>,
) -> ServiceResult<HttpResponse> {
    let body = body.into_inner();

    let complaint = state
        .pg_db
        .send(DisputeComplaint {
            user_id: auth.id(),
            complaint_id: body.complaint_id,
            reason: body.reason,
        })
        .await??;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Complaint disputed. A manager will review it.",
        "complaint": complaint,
    })))
}

#[get("/my_complaints/")]
pub async fn my_complaints(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    let feedback = state.pg_db.send(FetchMyFeedback(auth.id())).await??;
    Ok(HttpResponse::Ok().json(feedback))
}

#[get("/complaints/")]
pub async fn open_complaints(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;
    let complaints = state.pg_db.send(FetchComplaints).await??;
    Ok(HttpResponse::Ok().json(complaints))
}

#[derive(Deserialize)]
pub struct ComplaintDecisionBody {
    pub complaint_id: i64,
    pub decision: String,
    pub manager_decision: Option<String>,
}

#[post("/complaint/process/")]
pub async fn process_complaint(
    state: Data<AppState>,
    auth: AuthUser,
    body: Json<ComplaintDecisionBody>,
) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;

    let upheld = match body.decision.trim() {
        "upheld" | "uphold" => true,
        "dismissed" | "dismiss" => false,
        other => return Err(ServiceError::bad_request(format!("Unknown decision '{other}'"))),
    };

    let decision = state
        .pg_db
        .send(ProcessComplaint {
            manager_id: auth.id(),
            complaint_id: body.complaint_id,
            upheld,
            notes: body
                .manager_decision
                .as_deref()
                .map(str::trim)
                .filter(|notes| !notes.is_empty())
                .map(str::to_owned),
        })
        .await??;

    Ok(HttpResponse::Ok().json(decision))
}

#[get("/compliments/")]
pub async fn pending_compliments(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;
    let compliments = state.pg_db.send(FetchCompliments).await??;
    Ok(HttpResponse::Ok().json(compliments))
}

#[derive(Deserialize)]
pub struct ComplimentDecisionBody {
    pub compliment_id: i64,
    pub decision: Option<String>,
}

#[post("/compliment/process/")]
pub async fn process_compliment(
    state: Data<AppState>,
    auth: AuthUser,
    body: Json<ComplimentDecisionBody>,
) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;

    let approve = !matches!(body.decision.as_deref().map(str::trim), Some("rejected" | "reject"));

    let decision = state
        .pg_db
        .send(ProcessCompliment {
            manager_id: auth.id(),
            compliment_id: body.compliment_id,
            approve,
        })
        .await??;

    Ok(HttpResponse::Ok().json(decision))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(value: serde_json::Value) -> FeedbackBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn picks_the_id_matching_the_target_type() {
        let chef = body(json!({ "target_type": "chef", "description": "cold", "chef_id": 4, "delivery_id": 9 }));
        assert!(matches!(chef.target().unwrap(), FeedbackTarget::Employee(TargetType::Chef, 4)));

        let customer = body(json!({ "target_type": "customer", "description": "rude", "customer_username": " bob " }));
        assert!(matches!(customer.target().unwrap(), FeedbackTarget::Customer(name) if name == "bob"));
    }

    #[test]
    fn missing_or_unknown_target_is_rejected() {
        let missing = body(json!({ "target_type": "delivery", "description": "late" }));
        assert!(matches!(missing.target(), Err(ServiceError::BadRequest(_))));

        let unknown = body(json!({ "target_type": "manager", "description": "?" }));
        assert!(matches!(unknown.target(), Err(ServiceError::BadRequest(_))));
    }
}
