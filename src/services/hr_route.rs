use actix_web::web::{Data, Json};
use actix_web::{get, post, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::rules::{validate_registration, SalaryAction};
use crate::services::auth::{hash_in_pool, AuthUser};
use crate::services::chef_route::refresh_menu;
use crate::services::db_utils::AppState;
use crate::services::messages::{AdjustSalary, AwardBonus, FetchEmployees, FireEmployee, HireEmployee};
use crate::types::{dollars_to_cents, EmployeeType};

#[get("/employees/")]
pub async fn employees(state: Data<AppState>, auth: AuthUser) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;
    let staff = state.pg_db.send(FetchEmployees).await??;
    Ok(HttpResponse::Ok().json(staff))
}

#[derive(Deserialize)]
pub struct HireBody {
    pub username: String,
    pub email: String,
    pub password: String,
    pub employee_type: String,
    #[serde(default)]
    pub salary: f64,
}

#[post("/hire/")]
pub async fn hire(state: Data<AppState>, auth: AuthUser, body: Json<HireBody>) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;
    validate_registration(&body.username, &body.email, &body.password)?;
    let employee_type = body.employee_type.parse::<EmployeeType>()?;

    if !body.salary.is_finite() || body.salary < 0.0 {
        return Err(ServiceError::bad_request("Salary cannot be negative"));
    }
    let password_hash = hash_in_pool(body.password.clone()).await?;

    let employee = state
        .pg_db
        .send(HireEmployee {
            username: body.username.trim().to_owned(),
            email: body.email.trim().to_lowercase(),
            password_hash,
            employee_type,
            salary: dollars_to_cents(body.salary),
        })
        .await??;

    info!(manager = auth.id(), employee = employee.id, %employee_type, "Employee hired");
    Ok(HttpResponse::Created().json(json!({
        "message": format!("Hired {} as {employee_type}", employee.username),
        "employee": employee,
    })))
}

#[derive(Deserialize)]
pub struct FireBody {
    pub employee_id: i64,
    pub employee_type: Option<String>,
}

#[post("/fire/")]
pub async fn fire(state: Data<AppState>, auth: AuthUser, body: Json<FireBody>) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;

    let employee_type = match body.employee_type.as_deref() {
        Some(kind) => Some(kind.parse::<EmployeeType>()?),
        None => None,
    };

    let employee = state
        .pg_db
        .send(FireEmployee {
            employee_id: body.employee_id,
            employee_type,
        })
        .await??;

    refresh_menu(&state).await;

    info!(manager = auth.id(), employee = employee.id, "Employee fired");
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("{} has been terminated", employee.username),
        "employee": employee,
    })))
}

#[derive(Deserialize)]
pub struct SalaryBody {
    pub employee_id: i64,
    pub action: SalaryAction,
    pub amount: f64,
    #[serde(default)]
    pub is_percentage: bool,
}

#[post("/salary/")]
pub async fn salary(state: Data<AppState>, auth: AuthUser, body: Json<SalaryBody>) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;

    let change = state
        .pg_db
        .send(AdjustSalary {
            employee_id: body.employee_id,
            action: body.action,
            amount: body.amount,
            is_percentage: body.is_percentage,
        })
        .await??;

    Ok(HttpResponse::Ok().json(change))
}

#[derive(Deserialize)]
pub struct BonusBody {
    pub employee_id: i64,
    pub bonus_amount: f64,
    pub reason: Option<String>,
}

#[post("/bonus/")]
pub async fn bonus(state: Data<AppState>, auth: AuthUser, body: Json<BonusBody>) -> ServiceResult<HttpResponse> {
    auth.require_manager()?;

    if !body.bonus_amount.is_finite() || body.bonus_amount <= 0.0 {
        return Err(ServiceError::bad_request("Bonus amount must be positive"));
    }

    let body = body.into_inner();
    let change = state
        .pg_db
        .send(AwardBonus {
            employee_id: body.employee_id,
            amount: dollars_to_cents(body.bonus_amount),
            reason: body.reason,
        })
        .await??;

    Ok(HttpResponse::Ok().json(change))
}
