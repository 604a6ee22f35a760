use actix::Handler;
use diesel::prelude::*;
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::schema::{customer_profiles, employees, registration_requests, users};
use crate::services::db_models::{CustomerProfile, Employee, RegistrationRequest, User};
use crate::services::db_utils::PgActor;
use crate::services::insertable::{NewCustomerProfile, NewRegistrationRequest, NewUser};
use crate::services::messages::{
    CloseAccount, FetchCustomers, FetchProfile, FetchRegistrations, FetchUser, FetchUserByUsername,
    ProcessRegistration, SetBlacklist, SubmitRegistration,
};
use crate::services::views::{AccountClosed, CustomerView, EmployeeView, ProfileView};
use crate::types::{RegistrationStatus, TransactionType, UserType};

use super::{load_user, lock_customer_by_id, now, record_transaction, store_standing};

impl Handler<FetchUser> for PgActor {
    type Result = ServiceResult<User>;

    fn handle(&mut self, msg: FetchUser, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;
        load_user(&mut conn, msg.0)
    }
}

impl Handler<FetchUserByUsername> for PgActor {
    type Result = ServiceResult<User>;

    fn handle(&mut self, msg: FetchUserByUsername, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        users::table
            .filter(users::username.eq(msg.0.trim()))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or(ServiceError::Unauthorized)
    }
}

impl Handler<FetchProfile> for PgActor {
    type Result = ServiceResult<ProfileView>;

    fn handle(&mut self, msg: FetchProfile, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;
        let user = load_user(&mut conn, msg.0)?;

        let customer = customer_profiles::table
            .filter(customer_profiles::user_id.eq(user.id))
            .select(CustomerProfile::as_select())
            .first(&mut conn)
            .optional()?;

        let employee = employees::table
            .filter(employees::user_id.eq(user.id))
            .select(Employee::as_select())
            .first(&mut conn)
            .optional()?
            .map(|employee| EmployeeView::new(&employee, &user));

        Ok(ProfileView {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            user_type: user.role(),
            can_contribute_knowledge: user.can_contribute_knowledge,
            customer,
            employee,
        })
    }
}

fn email_blacklisted(conn: &mut PgConnection, email: &str) -> ServiceResult<bool> {
    let hits: i64 = customer_profiles::table
        .inner_join(users::table)
        .filter(users::email.eq(email))
        .filter(customer_profiles::is_blacklisted.eq(true))
        .count()
        .get_result(conn)?;

    Ok(hits > 0)
}

fn username_taken(conn: &mut PgConnection, username: &str) -> ServiceResult<bool> {
    let hits: i64 = users::table
        .filter(users::username.eq(username))
        .count()
        .get_result(conn)?;

    Ok(hits > 0)
}

impl Handler<SubmitRegistration> for PgActor {
    type Result = ServiceResult<RegistrationRequest>;

    fn handle(&mut self, msg: SubmitRegistration, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            if email_blacklisted(conn, &msg.email)? {
                warn!(email = %msg.email, "Registration attempt from blacklisted email");
                return Err(ServiceError::forbidden("This email address has been blacklisted"));
            }
            if username_taken(conn, &msg.username)? {
                return Err(ServiceError::conflict("Username already taken"));
            }

            let pending: i64 = registration_requests::table
                .filter(registration_requests::username.eq(&msg.username))
                .filter(registration_requests::status.eq(RegistrationStatus::Pending.as_str()))
                .count()
                .get_result(conn)?;
            if pending > 0 {
                return Err(ServiceError::conflict(
                    "A registration request for this username is already pending",
                ));
            }

            let request = diesel::insert_into(registration_requests::table)
                .values(NewRegistrationRequest {
                    username: msg.username,
                    email: msg.email,
                    first_name: msg.first_name,
                    last_name: msg.last_name,
                    password_hash: msg.password_hash,
                    status: RegistrationStatus::Pending.as_str().to_owned(),
                })
                .get_result::<RegistrationRequest>(conn)?;

            info!(request_id = request.id, username = %request.username, "Registration requested");
            Ok(request)
        })
    }
}

impl Handler<FetchRegistrations> for PgActor {
    type Result = ServiceResult<Vec<RegistrationRequest>>;

    fn handle(&mut self, _msg: FetchRegistrations, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        Ok(registration_requests::table
            .filter(registration_requests::status.eq(RegistrationStatus::Pending.as_str()))
            .order(registration_requests::created_at.asc())
            .select(RegistrationRequest::as_select())
            .load(&mut conn)?)
    }
}

impl Handler<ProcessRegistration> for PgActor {
    type Result = ServiceResult<RegistrationRequest>;

    fn handle(&mut self, msg: ProcessRegistration, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let request = registration_requests::table
                .find(msg.request_id)
                .select(RegistrationRequest::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ServiceError::not_found("Registration request not found"))?;

            if request.status != RegistrationStatus::Pending.as_str() {
                return Err(ServiceError::conflict("Registration request was already processed"));
            }

            let status = if msg.approve {
                if username_taken(conn, &request.username)? {
                    return Err(ServiceError::conflict("Username already taken"));
                }

                let user = diesel::insert_into(users::table)
                    .values(NewUser {
                        username: request.username.clone(),
                        email: request.email.clone(),
                        password_hash: request.password_hash.clone(),
                        first_name: request.first_name.clone(),
                        last_name: request.last_name.clone(),
                        user_type: UserType::Registered.as_str().to_owned(),
                    })
                    .get_result::<User>(conn)?;

                diesel::insert_into(customer_profiles::table)
                    .values(NewCustomerProfile { user_id: user.id })
                    .execute(conn)?;

                info!(user_id = user.id, username = %user.username, "Registration approved");
                RegistrationStatus::Approved
            } else {
                info!(request_id = request.id, "Registration rejected");
                RegistrationStatus::Rejected
            };

            Ok(diesel::update(registration_requests::table.find(request.id))
                .set((
                    registration_requests::status.eq(status.as_str()),
                    registration_requests::processed_by.eq(Some(msg.manager_id)),
                    registration_requests::processed_at.eq(Some(now())),
                ))
                .get_result::<RegistrationRequest>(conn)?)
        })
    }
}

impl Handler<FetchCustomers> for PgActor {
    type Result = ServiceResult<Vec<CustomerView>>;

    fn handle(&mut self, _msg: FetchCustomers, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let rows = customer_profiles::table
            .inner_join(users::table)
            .order(users::username.asc())
            .select((CustomerProfile::as_select(), User::as_select()))
            .load::<(CustomerProfile, User)>(&mut conn)?;

        Ok(rows
            .iter()
            .map(|(profile, user)| CustomerView::new(profile, user))
            .collect())
    }
}

impl Handler<CloseAccount> for PgActor {
    type Result = ServiceResult<AccountClosed>;

    fn handle(&mut self, msg: CloseAccount, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let (user, profile) = lock_customer_by_id(conn, msg.customer_id)?;
            if !user.is_active || profile.closed_at.is_some() {
                return Err(ServiceError::conflict("Account is already closed"));
            }

            let cleared_amount = profile.deposit_balance;

            diesel::update(customer_profiles::table.find(profile.id))
                .set((
                    customer_profiles::deposit_balance.eq(0),
                    customer_profiles::closed_at.eq(Some(now())),
                ))
                .execute(conn)?;
            diesel::update(users::table.find(user.id))
                .set(users::is_active.eq(false))
                .execute(conn)?;

            if cleared_amount > 0 {
                record_transaction(conn, user.id, TransactionType::AccountClosure, -cleared_amount, None, 0)?;
            }

            warn!(user_id = user.id, cleared_amount, reason = %msg.reason, "Customer account closed");

            Ok(AccountClosed {
                customer_id: profile.id,
                cleared_amount,
                message: format!("Account of {} closed", user.username),
            })
        })
    }
}

impl Handler<SetBlacklist> for PgActor {
    type Result = ServiceResult<CustomerView>;

    fn handle(&mut self, msg: SetBlacklist, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let (user, profile) = lock_customer_by_id(conn, msg.customer_id)?;
            if profile.is_blacklisted == msg.blacklisted {
                return Err(ServiceError::conflict(if msg.blacklisted {
                    "Customer is already blacklisted"
                } else {
                    "Customer is not blacklisted"
                }));
            }

            let mut standing = profile.standing(user.role());
            if msg.blacklisted {
                let cleared_balance = standing.blacklist();
                store_standing(conn, &user, &profile, &standing)?;
                if cleared_balance > 0 {
                    record_transaction(conn, user.id, TransactionType::AccountClosure, -cleared_balance, None, 0)?;
                }
                warn!(user_id = user.id, cleared_balance, "Customer blacklisted by manager");
            } else {
                standing.lift_blacklist();
                store_standing(conn, &user, &profile, &standing)?;
                // A closed account stays closed.
                if profile.closed_at.is_none() {
                    diesel::update(users::table.find(user.id))
                        .set(users::is_active.eq(true))
                        .execute(conn)?;
                }
            }

            let (user, profile) = lock_customer_by_id(conn, profile.id)?;
            info!(user_id = user.id, blacklisted = msg.blacklisted, "Blacklist updated");
            Ok(CustomerView::new(&profile, &user))
        })
    }
}
