//! `Handler` implementations of `PgActor`, one file per area of the API.
//!
//! Helpers in this module are shared by several areas: loading the calling
//! customer or employee, writing rule results back and resolving usernames.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::rules::{CustomerStanding, StaffRecord, WarningOutcome};
use crate::schema::{customer_profiles, employees, food_ratings, menu_items, order_items, transactions, users};
use crate::services::db_models::{CustomerProfile, Employee, Order, User};
use crate::services::insertable::NewTransaction;
use crate::services::views::OrderLineView;
use crate::types::{EmployeeType, OrderStatus, TransactionType};

mod accounts;
mod delivery;
mod discussion;
mod feedback;
mod hr;
mod kb;
mod menu;
mod orders;

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub(crate) fn load_user(conn: &mut PgConnection, user_id: i64) -> ServiceResult<User> {
    users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("User not found"))
}

pub(crate) fn load_customer(conn: &mut PgConnection, user_id: i64) -> ServiceResult<(User, CustomerProfile)> {
    let user = load_user(conn, user_id)?;

    let profile = customer_profiles::table
        .filter(customer_profiles::user_id.eq(user_id))
        .select(CustomerProfile::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::forbidden("Only customers can do this"))?;

    Ok((user, profile))
}

/// Calling customer with the profile row locked until the transaction ends.
/// Every write to a balance or a counter goes through one of the `lock_*` loaders.
pub(crate) fn lock_customer(conn: &mut PgConnection, user_id: i64) -> ServiceResult<(User, CustomerProfile)> {
    let profile = customer_profiles::table
        .filter(customer_profiles::user_id.eq(user_id))
        .select(CustomerProfile::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::forbidden("Only customers can do this"))?;
    let user = load_user(conn, user_id)?;

    Ok((user, profile))
}

pub(crate) fn lock_profile(conn: &mut PgConnection, profile_id: i64) -> ServiceResult<CustomerProfile> {
    customer_profiles::table
        .find(profile_id)
        .select(CustomerProfile::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("Customer not found"))
}

/// Locks both the profile and the user row.
pub(crate) fn lock_customer_by_id(conn: &mut PgConnection, customer_id: i64) -> ServiceResult<(User, CustomerProfile)> {
    let (profile, user) = customer_profiles::table
        .inner_join(users::table)
        .filter(customer_profiles::id.eq(customer_id))
        .select((CustomerProfile::as_select(), User::as_select()))
        .for_update()
        .first::<(CustomerProfile, User)>(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("Customer not found"))?;

    Ok((user, profile))
}

/// Active employee record of the caller, restricted to one kind of staff.
pub(crate) fn load_employee(
    conn: &mut PgConnection,
    user_id: i64,
    kind: EmployeeType,
) -> ServiceResult<Employee> {
    let employee = employees::table
        .filter(employees::user_id.eq(user_id))
        .select(Employee::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::forbidden(format!("Only {kind} staff can do this")))?;

    if employee.employee_type != kind.as_str() || !employee.is_active {
        return Err(ServiceError::forbidden(format!("Only {kind} staff can do this")));
    }

    Ok(employee)
}

pub(crate) fn order_status(order: &Order) -> ServiceResult<OrderStatus> {
    order
        .status
        .parse()
        .map_err(|err| ServiceError::Internal(format!("Order {}: {err}", order.id)))
}

pub(crate) fn usernames(conn: &mut PgConnection, ids: &[i64]) -> ServiceResult<HashMap<i64, String>> {
    let unique: HashSet<i64> = ids.iter().copied().collect();

    Ok(users::table
        .filter(users::id.eq_any(unique))
        .select((users::id, users::username))
        .load::<(i64, String)>(conn)?
        .into_iter()
        .collect())
}

/// Usernames keyed by employee id.
pub(crate) fn employee_names(conn: &mut PgConnection, ids: &[i64]) -> ServiceResult<HashMap<i64, String>> {
    let unique: HashSet<i64> = ids.iter().copied().collect();

    Ok(employees::table
        .inner_join(users::table)
        .filter(employees::id.eq_any(unique))
        .select((employees::id, users::username))
        .load::<(i64, String)>(conn)?
        .into_iter()
        .collect())
}

/// Usernames keyed by customer profile id.
pub(crate) fn customer_names(conn: &mut PgConnection, ids: &[i64]) -> ServiceResult<HashMap<i64, String>> {
    let unique: HashSet<i64> = ids.iter().copied().collect();

    Ok(customer_profiles::table
        .inner_join(users::table)
        .filter(customer_profiles::id.eq_any(unique))
        .select((customer_profiles::id, users::username))
        .load::<(i64, String)>(conn)?
        .into_iter()
        .collect())
}

pub(crate) fn order_lines(
    conn: &mut PgConnection,
    order_ids: &[i64],
) -> ServiceResult<HashMap<i64, Vec<OrderLineView>>> {
    let rows = order_items::table
        .inner_join(menu_items::table)
        .left_join(food_ratings::table)
        .filter(order_items::order_id.eq_any(order_ids))
        .select((
            order_items::id,
            order_items::order_id,
            order_items::menu_item_id,
            menu_items::name,
            order_items::quantity,
            order_items::price_at_time,
            food_ratings::id.nullable(),
        ))
        .order(order_items::id.asc())
        .load::<(i64, i64, i64, String, i32, i64, Option<i64>)>(conn)?;

    let mut lines: HashMap<i64, Vec<OrderLineView>> = HashMap::new();
    for (order_item_id, order_id, menu_item_id, name, quantity, price, rating_id) in rows {
        lines.entry(order_id).or_default().push(OrderLineView {
            order_item_id,
            menu_item_id,
            name,
            quantity,
            price,
            rated: rating_id.is_some(),
        });
    }

    Ok(lines)
}

pub(crate) fn store_standing(
    conn: &mut PgConnection,
    user: &User,
    profile: &CustomerProfile,
    standing: &CustomerStanding,
) -> ServiceResult<()> {
    diesel::update(customer_profiles::table.find(profile.id))
        .set((
            customer_profiles::warnings_count.eq(standing.warnings_count),
            customer_profiles::deposit_balance.eq(standing.deposit_balance),
            customer_profiles::total_spent.eq(standing.total_spent),
            customer_profiles::order_count.eq(standing.order_count),
            customer_profiles::is_blacklisted.eq(standing.is_blacklisted),
            customer_profiles::vip_free_deliveries_remaining.eq(standing.vip_free_deliveries_remaining),
        ))
        .execute(conn)?;

    diesel::update(users::table.find(user.id))
        .set((
            users::user_type.eq(standing.user_type.as_str()),
            users::is_active.eq(user.is_active && !standing.is_blacklisted),
        ))
        .execute(conn)?;

    Ok(())
}

pub(crate) fn record_transaction(
    conn: &mut PgConnection,
    user_id: i64,
    kind: TransactionType,
    amount: i64,
    order_id: Option<i64>,
    balance_after: i64,
) -> ServiceResult<()> {
    diesel::insert_into(transactions::table)
        .values(NewTransaction {
            user_id,
            transaction_type: kind.as_str().to_owned(),
            amount,
            order_id,
            payment_intent_id: None,
            balance_after,
        })
        .execute(conn)?;

    Ok(())
}

/// Issues one warning to a customer and applies whatever the threshold triggers.
pub(crate) fn issue_warning(
    conn: &mut PgConnection,
    user: &User,
    profile: &CustomerProfile,
) -> ServiceResult<WarningOutcome> {
    let profile = lock_profile(conn, profile.id)?;
    let user = load_user(conn, user.id)?;

    let mut standing = profile.standing(user.role());
    let outcome = standing.apply_warning();
    store_standing(conn, &user, &profile, &standing)?;
    settle_warning(conn, &user, &outcome)?;

    Ok(outcome)
}

/// Logs a warning that was already stored and books the cleared deposit of a
/// blacklisted customer.
pub(crate) fn settle_warning(conn: &mut PgConnection, user: &User, outcome: &WarningOutcome) -> ServiceResult<()> {
    match outcome {
        WarningOutcome::Warned { warnings, max } => {
            info!(user_id = user.id, warnings, max, "Warning issued");
        }
        WarningOutcome::Blacklisted { cleared_balance } => {
            warn!(user_id = user.id, cleared_balance, "Customer blacklisted after maximum warnings");
            if *cleared_balance > 0 {
                record_transaction(conn, user.id, TransactionType::AccountClosure, -cleared_balance, None, 0)?;
            }
        }
        WarningOutcome::DemotedFromVip => {
            warn!(user_id = user.id, "VIP demoted after maximum warnings");
        }
    }

    Ok(())
}

pub(crate) fn store_record(conn: &mut PgConnection, employee_id: i64, record: &StaffRecord) -> ServiceResult<()> {
    diesel::update(employees::table.find(employee_id))
        .set((
            employees::salary.eq(record.salary),
            employees::complaint_count.eq(record.complaint_count),
            employees::compliment_count.eq(record.compliment_count),
            employees::demotion_count.eq(record.demotion_count),
        ))
        .execute(conn)?;

    Ok(())
}
