use actix::Handler;
use diesel::prelude::*;
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::rules::feedback_weight;
use crate::schema::{complaints, compliments, customer_profiles, employees, orders, users};
use crate::services::db_models::{Complaint, Compliment, CustomerProfile, Employee, User};
use crate::services::db_utils::PgActor;
use crate::services::insertable::{NewComplaint, NewCompliment};
use crate::services::messages::{
    DisputeComplaint, FeedbackTarget, FetchComplaints, FetchCompliments, FetchFeedbackTargets, FetchMyFeedback,
    FileComplaint, FileCompliment, ProcessComplaint, ProcessCompliment,
};
use crate::services::views::{ComplaintView, ComplimentView, FeedbackDecision, FeedbackTargets, MyFeedback, TargetOption};
use crate::types::{ComplaintStatus, ComplimentStatus, EmployeeType, TargetType};

use super::{issue_warning, load_user, now, store_record, usernames};

fn staff_options(conn: &mut PgConnection, kind: EmployeeType) -> ServiceResult<Vec<TargetOption>> {
    Ok(employees::table
        .inner_join(users::table)
        .filter(employees::employee_type.eq(kind.as_str()))
        .filter(employees::is_active.eq(true))
        .order(users::username.asc())
        .select((employees::id, users::id, users::username))
        .load::<(i64, i64, String)>(conn)?
        .into_iter()
        .map(|(id, user_id, username)| TargetOption { id, user_id, username })
        .collect())
}

impl Handler<FetchFeedbackTargets> for PgActor {
    type Result = ServiceResult<FeedbackTargets>;

    fn handle(&mut self, _msg: FetchFeedbackTargets, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let customers = customer_profiles::table
            .inner_join(users::table)
            .filter(users::is_active.eq(true))
            .order(users::username.asc())
            .select((customer_profiles::id, users::id, users::username))
            .load::<(i64, i64, String)>(&mut conn)?
            .into_iter()
            .map(|(id, user_id, username)| TargetOption { id, user_id, username })
            .collect();

        Ok(FeedbackTargets {
            chefs: staff_options(&mut conn, EmployeeType::Chef)?,
            delivery_people: staff_options(&mut conn, EmployeeType::Delivery)?,
            customers,
        })
    }
}

/// Checks who may address whom and returns the target's user id and kind.
fn resolve_target(conn: &mut PgConnection, author: &User, target: &FeedbackTarget) -> ServiceResult<(i64, TargetType)> {
    let (target_user_id, target_type) = match target {
        FeedbackTarget::Employee(target_type, employee_id) => {
            let employee = employees::table
                .find(*employee_id)
                .select(Employee::as_select())
                .first(conn)
                .optional()?
                .filter(|employee| employee.is_active && employee.employee_type == target_type.as_str())
                .ok_or_else(|| ServiceError::not_found(format!("No active {target_type} with id {employee_id}")))?;
            (employee.user_id, *target_type)
        }
        FeedbackTarget::Customer(username) => {
            if author.role().is_customer() {
                return Err(ServiceError::forbidden("Customers can only give feedback about staff"));
            }
            let user_id = customer_profiles::table
                .inner_join(users::table)
                .filter(users::username.eq(username.trim()))
                .select(users::id)
                .first::<i64>(conn)
                .optional()?
                .ok_or_else(|| ServiceError::not_found(format!("Customer '{username}' not found")))?;
            (user_id, TargetType::Customer)
        }
    };

    if target_user_id == author.id {
        return Err(ServiceError::bad_request("You cannot give feedback about yourself"));
    }

    Ok((target_user_id, target_type))
}

fn check_order(conn: &mut PgConnection, order_id: Option<i64>) -> ServiceResult<()> {
    if let Some(order_id) = order_id {
        let found: i64 = orders::table.filter(orders::id.eq(order_id)).count().get_result(conn)?;
        if found == 0 {
            return Err(ServiceError::not_found("Order not found"));
        }
    }
    Ok(())
}

fn require_description(description: &str) -> ServiceResult<()> {
    if description.trim().is_empty() {
        return Err(ServiceError::bad_request("Description is required"));
    }
    Ok(())
}

impl Handler<FileComplaint> for PgActor {
    type Result = ServiceResult<Complaint>;

    fn handle(&mut self, msg: FileComplaint, _ctx: &mut Self::Context) -> Self::Result {
        require_description(&msg.description)?;
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let author = load_user(conn, msg.author_id)?;
            let (target_user_id, target_type) = resolve_target(conn, &author, &msg.target)?;
            check_order(conn, msg.order_id)?;

            let complaint = diesel::insert_into(complaints::table)
                .values(NewComplaint {
                    complainant_id: author.id,
                    target_user_id,
                    target_type: target_type.as_str().to_owned(),
                    order_id: msg.order_id,
                    description: msg.description.trim().to_owned(),
                    status: ComplaintStatus::Pending.as_str().to_owned(),
                    weight: feedback_weight(author.role()),
                })
                .get_result::<Complaint>(conn)?;

            info!(complaint_id = complaint.id, target_user_id, weight = complaint.weight, "Complaint filed");
            Ok(complaint)
        })
    }
}

impl Handler<FileCompliment> for PgActor {
    type Result = ServiceResult<Compliment>;

    fn handle(&mut self, msg: FileCompliment, _ctx: &mut Self::Context) -> Self::Result {
        require_description(&msg.description)?;
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let author = load_user(conn, msg.author_id)?;
            let (target_user_id, target_type) = resolve_target(conn, &author, &msg.target)?;
            check_order(conn, msg.order_id)?;

            let compliment = diesel::insert_into(compliments::table)
                .values(NewCompliment {
                    author_id: author.id,
                    target_user_id,
                    target_type: target_type.as_str().to_owned(),
                    order_id: msg.order_id,
                    description: msg.description.trim().to_owned(),
                    status: ComplimentStatus::Pending.as_str().to_owned(),
                    weight: feedback_weight(author.role()),
                })
                .get_result::<Compliment>(conn)?;

            info!(compliment_id = compliment.id, target_user_id, "Compliment filed");
            Ok(compliment)
        })
    }
}

impl Handler<DisputeComplaint> for PgActor {
    type Result = ServiceResult<Complaint>;

    fn handle(&mut self, msg: DisputeComplaint, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let complaint = lock_complaint(conn, msg.complaint_id)?;
            if complaint.target_user_id != msg.user_id {
                return Err(ServiceError::forbidden("You can only dispute complaints filed against you"));
            }
            if complaint.status != ComplaintStatus::Pending.as_str() {
                return Err(ServiceError::bad_request("Only pending complaints can be disputed"));
            }

            let complaint = diesel::update(complaints::table.find(complaint.id))
                .set((
                    complaints::status.eq(ComplaintStatus::Disputed.as_str()),
                    complaints::dispute_reason.eq(msg.reason.clone()),
                ))
                .get_result::<Complaint>(conn)?;

            info!(complaint_id = complaint.id, "Complaint disputed");
            Ok(complaint)
        })
    }
}

/// Locks the complaint so that concurrent decisions see each other's status.
fn lock_complaint(conn: &mut PgConnection, complaint_id: i64) -> ServiceResult<Complaint> {
    complaints::table
        .find(complaint_id)
        .select(Complaint::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("Complaint not found"))
}

fn complaint_views(conn: &mut PgConnection, rows: Vec<Complaint>) -> ServiceResult<Vec<ComplaintView>> {
    let ids: Vec<i64> = rows
        .iter()
        .flat_map(|complaint| [complaint.complainant_id, complaint.target_user_id])
        .collect();
    let names = usernames(conn, &ids)?;

    Ok(rows
        .into_iter()
        .map(|complaint| ComplaintView {
            complainant: names.get(&complaint.complainant_id).cloned().unwrap_or_default(),
            target: names.get(&complaint.target_user_id).cloned().unwrap_or_default(),
            complaint,
        })
        .collect())
}

fn compliment_views(conn: &mut PgConnection, rows: Vec<Compliment>) -> ServiceResult<Vec<ComplimentView>> {
    let ids: Vec<i64> = rows
        .iter()
        .flat_map(|compliment| [compliment.author_id, compliment.target_user_id])
        .collect();
    let names = usernames(conn, &ids)?;

    Ok(rows
        .into_iter()
        .map(|compliment| ComplimentView {
            author: names.get(&compliment.author_id).cloned().unwrap_or_default(),
            target: names.get(&compliment.target_user_id).cloned().unwrap_or_default(),
            compliment,
        })
        .collect())
}

impl Handler<FetchMyFeedback> for PgActor {
    type Result = ServiceResult<MyFeedback>;

    fn handle(&mut self, msg: FetchMyFeedback, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let filed = complaints::table
            .filter(complaints::complainant_id.eq(msg.0))
            .order(complaints::created_at.desc())
            .select(Complaint::as_select())
            .load(&mut conn)?;
        let received = complaints::table
            .filter(complaints::target_user_id.eq(msg.0))
            .order(complaints::created_at.desc())
            .select(Complaint::as_select())
            .load(&mut conn)?;
        let praise = compliments::table
            .filter(compliments::author_id.eq(msg.0).or(compliments::target_user_id.eq(msg.0)))
            .order(compliments::created_at.desc())
            .select(Compliment::as_select())
            .load(&mut conn)?;

        Ok(MyFeedback {
            filed: complaint_views(&mut conn, filed)?,
            received: complaint_views(&mut conn, received)?,
            compliments: compliment_views(&mut conn, praise)?,
        })
    }
}

impl Handler<FetchComplaints> for PgActor {
    type Result = ServiceResult<Vec<ComplaintView>>;

    fn handle(&mut self, _msg: FetchComplaints, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let open = complaints::table
            .filter(complaints::status.eq_any([
                ComplaintStatus::Pending.as_str(),
                ComplaintStatus::Disputed.as_str(),
            ]))
            .order(complaints::created_at.asc())
            .select(Complaint::as_select())
            .load(&mut conn)?;

        complaint_views(&mut conn, open)
    }
}

/// Loads the customer profile of a user, if the user is a customer at all.
fn customer_of(conn: &mut PgConnection, user: &User) -> ServiceResult<Option<CustomerProfile>> {
    if !user.role().is_customer() {
        return Ok(None);
    }

    Ok(customer_profiles::table
        .filter(customer_profiles::user_id.eq(user.id))
        .select(CustomerProfile::as_select())
        .first(conn)
        .optional()?)
}

fn lock_staff_of(conn: &mut PgConnection, user_id: i64) -> ServiceResult<Employee> {
    employees::table
        .filter(employees::user_id.eq(user_id))
        .select(Employee::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("Employee record not found"))
}

impl Handler<ProcessComplaint> for PgActor {
    type Result = ServiceResult<FeedbackDecision>;

    fn handle(&mut self, msg: ProcessComplaint, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let complaint = lock_complaint(conn, msg.complaint_id)?;
            if !complaint.status.parse::<ComplaintStatus>()?.is_open() {
                return Err(ServiceError::conflict("Complaint was already processed"));
            }

            let (status, message) = if msg.upheld {
                let target = load_user(conn, complaint.target_user_id)?;

                let message = match complaint.target_type.parse::<TargetType>()? {
                    TargetType::Customer => match customer_of(conn, &target)? {
                        Some(profile) => issue_warning(conn, &target, &profile)?.describe(),
                        None => "Complaint upheld".to_owned(),
                    },
                    TargetType::Chef | TargetType::Delivery => {
                        let employee = lock_staff_of(conn, target.id)?;
                        let mut record = employee.record();
                        let outcome = record.apply_complaint(complaint.weight);
                        store_record(conn, employee.id, &record)?;

                        if outcome.demoted {
                            warn!(employee_id = employee.id, salary = record.salary, "Employee demoted");
                        }
                        match (outcome.demoted, outcome.termination_eligible) {
                            (_, true) => format!("Complaint upheld: {} is now eligible for termination", target.username),
                            (true, false) => format!("Complaint upheld: {} was demoted", target.username),
                            (false, false) => format!(
                                "Complaint upheld: {} has {} complaint(s)",
                                target.username, record.complaint_count
                            ),
                        }
                    }
                };
                (ComplaintStatus::Upheld, message)
            } else {
                let complainant = load_user(conn, complaint.complainant_id)?;
                let message = match customer_of(conn, &complainant)? {
                    Some(profile) => format!(
                        "Complaint dismissed, complainant warned. {}",
                        issue_warning(conn, &complainant, &profile)?.describe()
                    ),
                    None => "Complaint dismissed".to_owned(),
                };
                (ComplaintStatus::Dismissed, message)
            };

            diesel::update(complaints::table.find(complaint.id))
                .set((
                    complaints::status.eq(status.as_str()),
                    complaints::manager_decision.eq(msg.notes.clone()),
                    complaints::processed_by.eq(Some(msg.manager_id)),
                    complaints::processed_at.eq(Some(now())),
                ))
                .execute(conn)?;

            info!(complaint_id = complaint.id, status = %status, "Complaint processed");
            Ok(FeedbackDecision {
                id: complaint.id,
                status: status.as_str().to_owned(),
                message,
            })
        })
    }
}

impl Handler<FetchCompliments> for PgActor {
    type Result = ServiceResult<Vec<ComplimentView>>;

    fn handle(&mut self, _msg: FetchCompliments, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let pending = compliments::table
            .filter(compliments::status.eq(ComplimentStatus::Pending.as_str()))
            .order(compliments::created_at.asc())
            .select(Compliment::as_select())
            .load(&mut conn)?;

        compliment_views(&mut conn, pending)
    }
}

impl Handler<ProcessCompliment> for PgActor {
    type Result = ServiceResult<FeedbackDecision>;

    fn handle(&mut self, msg: ProcessCompliment, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let compliment = compliments::table
                .find(msg.compliment_id)
                .select(Compliment::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ServiceError::not_found("Compliment not found"))?;

            if compliment.status != ComplimentStatus::Pending.as_str() {
                return Err(ServiceError::conflict("Compliment was already processed"));
            }

            let (status, message) = if !msg.approve {
                (ComplimentStatus::Rejected, "Compliment rejected".to_owned())
            } else if compliment.target_type.parse::<TargetType>()? == TargetType::Customer {
                (ComplimentStatus::Approved, "Compliment approved".to_owned())
            } else {
                let employee = lock_staff_of(conn, compliment.target_user_id)?;
                let mut record = employee.record();
                let outcome = record.apply_compliment(compliment.weight);
                store_record(conn, employee.id, &record)?;

                let message = if outcome.bonus_eligible {
                    "Compliment approved: employee is now eligible for a bonus".to_owned()
                } else if outcome.complaints_cancelled > 0 {
                    format!("Compliment approved: {} complaint(s) cancelled", outcome.complaints_cancelled)
                } else {
                    "Compliment approved".to_owned()
                };
                (ComplimentStatus::Approved, message)
            };

            diesel::update(compliments::table.find(compliment.id))
                .set((
                    compliments::status.eq(status.as_str()),
                    compliments::processed_by.eq(Some(msg.manager_id)),
                    compliments::processed_at.eq(Some(now())),
                ))
                .execute(conn)?;

            info!(compliment_id = compliment.id, status = %status, "Compliment processed");
            Ok(FeedbackDecision {
                id: compliment.id,
                status: status.as_str().to_owned(),
                message,
            })
        })
    }
}
