use actix::Handler;
use diesel::prelude::*;
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::rules::adjust_salary;
use crate::schema::{employees, menu_items, users};
use crate::services::db_models::{Employee, User};
use crate::services::db_utils::PgActor;
use crate::services::insertable::{NewEmployee, NewUser};
use crate::services::messages::{AdjustSalary, AwardBonus, FetchEmployees, FireEmployee, HireEmployee};
use crate::services::views::{EmployeeView, SalaryChange};
use crate::types::{EmployeeType, TransactionType, UserType};

use super::{record_transaction, store_record};

/// Employee and user rows, locked until the transaction ends.
fn lock_staff(conn: &mut PgConnection, employee_id: i64) -> ServiceResult<(Employee, User)> {
    employees::table
        .inner_join(users::table)
        .filter(employees::id.eq(employee_id))
        .select((Employee::as_select(), User::as_select()))
        .for_update()
        .first::<(Employee, User)>(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("Employee not found"))
}

impl Handler<FetchEmployees> for PgActor {
    type Result = ServiceResult<Vec<EmployeeView>>;

    fn handle(&mut self, _msg: FetchEmployees, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let staff = employees::table
            .inner_join(users::table)
            .order((employees::employee_type.asc(), users::username.asc()))
            .select((Employee::as_select(), User::as_select()))
            .load::<(Employee, User)>(&mut conn)?;

        Ok(staff
            .iter()
            .map(|(employee, user)| EmployeeView::new(employee, user))
            .collect())
    }
}

impl Handler<HireEmployee> for PgActor {
    type Result = ServiceResult<EmployeeView>;

    fn handle(&mut self, msg: HireEmployee, _ctx: &mut Self::Context) -> Self::Result {
        if msg.salary < 0 {
            return Err(ServiceError::bad_request("Salary cannot be negative"));
        }

        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let taken: i64 = users::table
                .filter(users::username.eq(&msg.username))
                .count()
                .get_result(conn)?;
            if taken > 0 {
                return Err(ServiceError::conflict("Username already taken"));
            }

            let user = diesel::insert_into(users::table)
                .values(NewUser {
                    username: msg.username.clone(),
                    email: msg.email.clone(),
                    password_hash: msg.password_hash.clone(),
                    first_name: String::new(),
                    last_name: String::new(),
                    user_type: UserType::from(msg.employee_type).as_str().to_owned(),
                })
                .get_result::<User>(conn)?;

            let employee = diesel::insert_into(employees::table)
                .values(NewEmployee {
                    user_id: user.id,
                    employee_type: msg.employee_type.as_str().to_owned(),
                    salary: msg.salary,
                })
                .get_result::<Employee>(conn)?;

            info!(employee_id = employee.id, kind = %msg.employee_type, "Employee hired");
            Ok(EmployeeView::new(&employee, &user))
        })
    }
}

impl Handler<FireEmployee> for PgActor {
    type Result = ServiceResult<EmployeeView>;

    fn handle(&mut self, msg: FireEmployee, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let (employee, user) = lock_staff(conn, msg.employee_id)?;

            if let Some(kind) = msg.employee_type {
                if employee.employee_type != kind.as_str() {
                    return Err(ServiceError::bad_request(format!("Employee {} is not a {kind}", employee.id)));
                }
            }
            if !employee.is_active {
                return Err(ServiceError::conflict("Employee was already terminated"));
            }

            let employee = diesel::update(employees::table.find(employee.id))
                .set(employees::is_active.eq(false))
                .get_result::<Employee>(conn)?;
            let user = diesel::update(users::table.find(user.id))
                .set(users::is_active.eq(false))
                .get_result::<User>(conn)?;

            if employee.employee_type == EmployeeType::Chef.as_str() {
                let withdrawn = diesel::update(menu_items::table.filter(menu_items::chef_id.eq(employee.id)))
                    .set(menu_items::is_available.eq(false))
                    .execute(conn)?;
                info!(employee_id = employee.id, withdrawn, "Menu items of former chef withdrawn");
            }

            warn!(employee_id = employee.id, demotions = employee.demotion_count, "Employee terminated");
            Ok(EmployeeView::new(&employee, &user))
        })
    }
}

impl Handler<AdjustSalary> for PgActor {
    type Result = ServiceResult<SalaryChange>;

    fn handle(&mut self, msg: AdjustSalary, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let (employee, _) = lock_staff(conn, msg.employee_id)?;
            let new_salary = adjust_salary(employee.salary, msg.action, msg.amount, msg.is_percentage)?;

            diesel::update(employees::table.find(employee.id))
                .set(employees::salary.eq(new_salary))
                .execute(conn)?;

            info!(employee_id = employee.id, old = employee.salary, new = new_salary, "Salary adjusted");
            Ok(SalaryChange {
                employee_id: employee.id,
                old_salary: employee.salary,
                new_salary,
            })
        })
    }
}

impl Handler<AwardBonus> for PgActor {
    type Result = ServiceResult<SalaryChange>;

    fn handle(&mut self, msg: AwardBonus, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let (employee, user) = lock_staff(conn, msg.employee_id)?;
            if !employee.is_active {
                return Err(ServiceError::bad_request("Cannot award a bonus to a former employee"));
            }

            let mut record = employee.record();
            record.award_bonus(msg.amount)?;
            store_record(conn, employee.id, &record)?;
            // For bonus rows balance_after holds the resulting salary.
            record_transaction(conn, user.id, TransactionType::Bonus, msg.amount, None, record.salary)?;

            info!(
                employee_id = employee.id,
                amount = msg.amount,
                reason = msg.reason.as_deref().unwrap_or_default(),
                "Bonus awarded"
            );
            Ok(SalaryChange {
                employee_id: employee.id,
                old_salary: employee.salary,
                new_salary: record.salary,
            })
        })
    }
}
