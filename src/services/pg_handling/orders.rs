use std::collections::{HashMap, HashSet};

use actix::Handler;
use diesel::prelude::*;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::rules::{validate_star_rating, validate_transition, CartLine, CheckoutDecision, StatusActor};
use crate::schema::{
    customer_profiles, delivery_ratings, employees, food_ratings, menu_items, order_items, orders, transactions,
    users,
};
use crate::services::db_models::{Employee, FoodRating, MenuItem, Order, OrderItem};
use crate::services::db_utils::PgActor;
use crate::services::insertable::{NewDeliveryRating, NewFoodRating, NewOrder, NewOrderItem, NewTransaction};
use crate::services::messages::{
    ChefUpdateStatus, CreditDeposit, FetchChefOrders, FetchChefRatings, FetchOrderHistory, FetchStaffStats,
    PlaceOrder, RateDelivery, RateFood,
};
use crate::services::views::{
    ActiveAndCompleted, CheckoutResult, ChefRatings, DepositCredited, KitchenOrder, OrderLineView, OrderPlaced,
    OrderSummary, RatingView, StaffStats,
};
use crate::types::{cents_to_dollars, EmployeeType, OrderStatus, TransactionType, UserType};

use super::{
    customer_names, load_customer, load_employee, lock_customer, now, order_lines, order_status, record_transaction, settle_warning,
    store_standing,
};

impl Handler<PlaceOrder> for PgActor {
    type Result = ServiceResult<CheckoutResult>;

    fn handle(&mut self, msg: PlaceOrder, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let (user, profile) = lock_customer(conn, msg.user_id)?;
            if profile.is_blacklisted {
                return Err(ServiceError::forbidden("This account has been blacklisted"));
            }

            let ids: Vec<i64> = msg.lines.iter().map(|(id, _)| *id).collect();
            let dishes: HashMap<i64, MenuItem> = menu_items::table
                .inner_join(employees::table)
                .filter(menu_items::id.eq_any(&ids))
                .filter(menu_items::is_available.eq(true))
                .filter(employees::is_active.eq(true))
                .select(MenuItem::as_select())
                .load::<MenuItem>(conn)?
                .into_iter()
                .map(|item| (item.id, item))
                .collect();

            let mut cart = Vec::with_capacity(msg.lines.len());
            for (menu_item_id, quantity) in &msg.lines {
                let dish = dishes
                    .get(menu_item_id)
                    .ok_or_else(|| ServiceError::not_found(format!("Menu item {menu_item_id} is not available")))?;
                if dish.is_vip_exclusive && user.role() != UserType::Vip {
                    return Err(ServiceError::forbidden(format!("{} is only available to VIP customers", dish.name)));
                }
                cart.push(CartLine {
                    unit_price: dish.price,
                    quantity: *quantity,
                });
            }

            let mut standing = profile.standing(user.role());
            let quote = standing.quote(&cart, msg.delivery_fee)?;

            let delivery_address = msg
                .delivery_address
                .as_deref()
                .map(str::trim)
                .filter(|address| !address.is_empty())
                .map(str::to_owned)
                .or_else(|| profile.default_address.clone())
                .ok_or_else(|| ServiceError::bad_request("Delivery address is required"))?;

            let receipt = match standing.checkout(quote) {
                CheckoutDecision::Accepted(receipt) => receipt,
                CheckoutDecision::Rejected { shortfall, outcome } => {
                    store_standing(conn, &user, &profile, &standing)?;
                    settle_warning(conn, &user, &outcome)?;

                    return Ok(CheckoutResult::Refused {
                        message: format!(
                            "Insufficient funds: please deposit ${:.2} more. {}",
                            cents_to_dollars(shortfall),
                            outcome.describe()
                        ),
                    });
                }
            };

            let quote = receipt.quote;
            let order = diesel::insert_into(orders::table)
                .values(NewOrder {
                    customer_id: profile.id,
                    delivery_address,
                    subtotal: quote.subtotal,
                    discount: quote.discount,
                    delivery_fee: quote.delivery_fee,
                    total_price: quote.total,
                    status: OrderStatus::Pending.as_str().to_owned(),
                    is_free_delivery: quote.free_delivery,
                })
                .get_result::<Order>(conn)?;

            let rows: Vec<NewOrderItem> = msg
                .lines
                .iter()
                .zip(&cart)
                .map(|((menu_item_id, quantity), line)| NewOrderItem {
                    order_id: order.id,
                    menu_item_id: *menu_item_id,
                    quantity: *quantity,
                    price_at_time: line.unit_price,
                })
                .collect();
            diesel::insert_into(order_items::table).values(&rows).execute(conn)?;

            for (menu_item_id, quantity) in &msg.lines {
                diesel::update(menu_items::table.find(*menu_item_id))
                    .set(menu_items::total_orders.eq(menu_items::total_orders + i64::from(*quantity)))
                    .execute(conn)?;
            }

            store_standing(conn, &user, &profile, &standing)?;
            record_transaction(
                conn,
                user.id,
                TransactionType::OrderPayment,
                -quote.total,
                Some(order.id),
                standing.deposit_balance,
            )?;

            info!(user_id = user.id, order_id = order.id, total = quote.total, "Order placed");
            if receipt.promoted_to_vip {
                info!(user_id = user.id, "Customer promoted to VIP");
            }
            if receipt.earned_free_delivery {
                info!(user_id = user.id, "VIP earned a free delivery");
            }

            Ok(CheckoutResult::Placed(OrderPlaced {
                order_id: order.id,
                subtotal: quote.subtotal,
                discount: quote.discount,
                delivery_fee: quote.delivery_fee,
                total_price: quote.total,
                new_balance: standing.deposit_balance,
                is_free_delivery: quote.free_delivery,
                promoted_to_vip: receipt.promoted_to_vip,
                status: OrderStatus::Pending,
            }))
        })
    }
}

fn items_summary(lines: &[OrderLineView]) -> String {
    lines
        .iter()
        .map(|line| format!("{}x {}", line.quantity, line.name))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Handler<FetchOrderHistory> for PgActor {
    type Result = ServiceResult<Vec<OrderSummary>>;

    fn handle(&mut self, msg: FetchOrderHistory, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;
        let (_, profile) = load_customer(&mut conn, msg.0)?;

        let history = orders::table
            .filter(orders::customer_id.eq(profile.id))
            .order(orders::created_at.desc())
            .select(Order::as_select())
            .load::<Order>(&mut conn)?;

        let ids: Vec<i64> = history.iter().map(|order| order.id).collect();
        let mut lines = order_lines(&mut conn, &ids)?;
        let rated: HashSet<i64> = delivery_ratings::table
            .filter(delivery_ratings::order_id.eq_any(&ids))
            .select(delivery_ratings::order_id)
            .load::<i64>(&mut conn)?
            .into_iter()
            .collect();

        history
            .into_iter()
            .map(|order| -> ServiceResult<OrderSummary> {
                let items = lines.remove(&order.id).unwrap_or_default();
                Ok(OrderSummary {
                    order_id: order.id,
                    items_summary: items_summary(&items),
                    items,
                    total_price: order.total_price,
                    status: order_status(&order)?.label().to_owned(),
                    date: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    delivery_person_id: order.delivery_person_id,
                    delivery_rated: rated.contains(&order.id),
                    delivery_address: order.delivery_address,
                })
            })
            .collect()
    }
}

impl Handler<CreditDeposit> for PgActor {
    type Result = ServiceResult<DepositCredited>;

    fn handle(&mut self, msg: CreditDeposit, _ctx: &mut Self::Context) -> Self::Result {
        if msg.amount <= 0 {
            return Err(ServiceError::bad_request("Deposit amount must be positive"));
        }

        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let (user, profile) = lock_customer(conn, msg.user_id)?;

            let seen: i64 = transactions::table
                .filter(transactions::payment_intent_id.eq(&msg.payment_intent_id))
                .count()
                .get_result(conn)?;
            if seen > 0 {
                return Err(ServiceError::conflict("This payment has already been credited"));
            }

            let new_balance = profile.deposit_balance + msg.amount;
            diesel::update(customer_profiles::table.find(profile.id))
                .set(customer_profiles::deposit_balance.eq(new_balance))
                .execute(conn)?;

            diesel::insert_into(transactions::table)
                .values(NewTransaction {
                    user_id: user.id,
                    transaction_type: TransactionType::Deposit.as_str().to_owned(),
                    amount: msg.amount,
                    order_id: None,
                    payment_intent_id: Some(msg.payment_intent_id.clone()),
                    balance_after: new_balance,
                })
                .execute(conn)?;

            info!(user_id = user.id, amount = msg.amount, new_balance, "Deposit credited");
            Ok(DepositCredited {
                amount: msg.amount,
                new_balance,
            })
        })
    }
}

fn delivered(order: &Order) -> ServiceResult<()> {
    if order_status(order)? != OrderStatus::Delivered {
        return Err(ServiceError::bad_request("You can only rate delivered orders"));
    }
    Ok(())
}

impl Handler<RateFood> for PgActor {
    type Result = ServiceResult<()>;

    fn handle(&mut self, msg: RateFood, _ctx: &mut Self::Context) -> Self::Result {
        validate_star_rating(msg.rating)?;
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let (_, profile) = load_customer(conn, msg.user_id)?;

            let (line, order) = order_items::table
                .inner_join(orders::table)
                .filter(order_items::id.eq(msg.order_item_id))
                .select((OrderItem::as_select(), Order::as_select()))
                .first::<(OrderItem, Order)>(conn)
                .optional()?
                .ok_or_else(|| ServiceError::not_found("Order item not found"))?;

            if order.customer_id != profile.id {
                return Err(ServiceError::forbidden("You can only rate your own orders"));
            }
            delivered(&order)?;

            let already: i64 = food_ratings::table
                .filter(food_ratings::order_item_id.eq(line.id))
                .count()
                .get_result(conn)?;
            if already > 0 {
                return Err(ServiceError::conflict("You have already rated this item"));
            }

            diesel::insert_into(food_ratings::table)
                .values(NewFoodRating {
                    order_item_id: line.id,
                    customer_id: profile.id,
                    rating: msg.rating,
                    comment: msg.comment.clone(),
                })
                .execute(conn)?;

            let chef_id = diesel::update(menu_items::table.find(line.menu_item_id))
                .set((
                    menu_items::rating_sum.eq(menu_items::rating_sum + i64::from(msg.rating)),
                    menu_items::rating_count.eq(menu_items::rating_count + 1),
                ))
                .returning(menu_items::chef_id)
                .get_result::<i64>(conn)?;

            diesel::update(employees::table.find(chef_id))
                .set((
                    employees::rating_sum.eq(employees::rating_sum + i64::from(msg.rating)),
                    employees::rating_count.eq(employees::rating_count + 1),
                ))
                .execute(conn)?;

            info!(order_item_id = line.id, rating = msg.rating, "Dish rated");
            Ok(())
        })
    }
}

impl Handler<RateDelivery> for PgActor {
    type Result = ServiceResult<()>;

    fn handle(&mut self, msg: RateDelivery, _ctx: &mut Self::Context) -> Self::Result {
        validate_star_rating(msg.rating)?;
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let (_, profile) = load_customer(conn, msg.user_id)?;

            let order = orders::table
                .find(msg.order_id)
                .select(Order::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| ServiceError::not_found("Order not found"))?;

            if order.customer_id != profile.id {
                return Err(ServiceError::forbidden("You can only rate your own orders"));
            }
            delivered(&order)?;
            let courier_id = order
                .delivery_person_id
                .ok_or_else(|| ServiceError::bad_request("This order has no delivery person"))?;

            let already: i64 = delivery_ratings::table
                .filter(delivery_ratings::order_id.eq(order.id))
                .count()
                .get_result(conn)?;
            if already > 0 {
                return Err(ServiceError::conflict("You have already rated this delivery"));
            }

            diesel::insert_into(delivery_ratings::table)
                .values(NewDeliveryRating {
                    order_id: order.id,
                    customer_id: profile.id,
                    delivery_person_id: courier_id,
                    rating: msg.rating,
                    comment: msg.comment.clone(),
                })
                .execute(conn)?;

            diesel::update(employees::table.find(courier_id))
                .set((
                    employees::rating_sum.eq(employees::rating_sum + i64::from(msg.rating)),
                    employees::rating_count.eq(employees::rating_count + 1),
                ))
                .execute(conn)?;

            info!(order_id = order.id, rating = msg.rating, "Delivery rated");
            Ok(())
        })
    }
}

/// Orders that contain at least one dish of the given chef.
fn chef_order_ids(conn: &mut PgConnection, chef_id: i64) -> ServiceResult<Vec<i64>> {
    Ok(order_items::table
        .inner_join(menu_items::table)
        .filter(menu_items::chef_id.eq(chef_id))
        .select(order_items::order_id)
        .distinct()
        .load::<i64>(conn)?)
}

impl Handler<FetchChefOrders> for PgActor {
    type Result = ServiceResult<ActiveAndCompleted<KitchenOrder>>;

    fn handle(&mut self, msg: FetchChefOrders, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;
        let chef = load_employee(&mut conn, msg.0, EmployeeType::Chef)?;

        let ids = chef_order_ids(&mut conn, chef.id)?;
        let rows = orders::table
            .inner_join(customer_profiles::table.inner_join(users::table))
            .filter(orders::id.eq_any(&ids))
            .order(orders::created_at.desc())
            .select((Order::as_select(), users::username))
            .load::<(Order, String)>(&mut conn)?;
        let mut lines = order_lines(&mut conn, &ids)?;

        let mut board = ActiveAndCompleted {
            active: Vec::new(),
            completed: Vec::new(),
        };
        for (order, customer) in rows {
            let status = order_status(&order)?;
            let view = KitchenOrder {
                id: order.id,
                status: order.status,
                customer,
                delivery_address: order.delivery_address,
                items: lines.remove(&order.id).unwrap_or_default(),
                created_at: order.created_at,
                updated_at: order.updated_at,
            };
            match status {
                OrderStatus::Pending | OrderStatus::Preparing => board.active.push(view),
                _ => board.completed.push(view),
            }
        }

        Ok(board)
    }
}

impl Handler<ChefUpdateStatus> for PgActor {
    type Result = ServiceResult<Order>;

    fn handle(&mut self, msg: ChefUpdateStatus, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let chef = load_employee(conn, msg.user_id, EmployeeType::Chef)?;

            let order = orders::table
                .find(msg.order_id)
                .select(Order::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ServiceError::not_found("Order not found"))?;

            if !chef_order_ids(conn, chef.id)?.contains(&order.id) {
                return Err(ServiceError::forbidden("This order contains none of your dishes"));
            }
            validate_transition(order_status(&order)?, msg.status, StatusActor::Chef)?;

            let order = diesel::update(orders::table.find(order.id))
                .set((orders::status.eq(msg.status.as_str()), orders::updated_at.eq(now())))
                .get_result::<Order>(conn)?;

            info!(order_id = order.id, status = %msg.status, "Kitchen updated order status");
            Ok(order)
        })
    }
}

impl Handler<FetchChefRatings> for PgActor {
    type Result = ServiceResult<ChefRatings>;

    fn handle(&mut self, msg: FetchChefRatings, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;
        let chef = load_employee(&mut conn, msg.0, EmployeeType::Chef)?;

        let rows = food_ratings::table
            .inner_join(order_items::table.inner_join(menu_items::table))
            .filter(menu_items::chef_id.eq(chef.id))
            .order(food_ratings::created_at.desc())
            .select((FoodRating::as_select(), menu_items::name))
            .load::<(FoodRating, String)>(&mut conn)?;

        let customers: Vec<i64> = rows.iter().map(|(rating, _)| rating.customer_id).collect();
        let names = customer_names(&mut conn, &customers)?;

        Ok(ChefRatings {
            average_rating: chef.average_rating(),
            ratings: rows
                .into_iter()
                .map(|(rating, menu_item)| RatingView {
                    id: rating.id,
                    menu_item,
                    customer: names.get(&rating.customer_id).cloned().unwrap_or_default(),
                    rating: rating.rating,
                    comment: rating.comment,
                    created_at: rating.created_at,
                })
                .collect(),
        })
    }
}

impl Handler<FetchStaffStats> for PgActor {
    type Result = ServiceResult<StaffStats>;

    fn handle(&mut self, msg: FetchStaffStats, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let employee = employees::table
            .filter(employees::user_id.eq(msg.0))
            .filter(employees::is_active.eq(true))
            .select(Employee::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| ServiceError::forbidden("Only staff members have statistics"))?;

        let completed_work: i64 = match employee.employee_type.parse::<EmployeeType>()? {
            EmployeeType::Chef => menu_items::table
                .filter(menu_items::chef_id.eq(employee.id))
                .filter(menu_items::is_available.eq(true))
                .count()
                .get_result(&mut conn)?,
            EmployeeType::Delivery => orders::table
                .filter(orders::delivery_person_id.eq(employee.id))
                .filter(orders::status.eq(OrderStatus::Delivered.as_str()))
                .count()
                .get_result(&mut conn)?,
        };

        let record = employee.record();
        Ok(StaffStats {
            average_rating: employee.average_rating(),
            rating_count: employee.rating_count,
            salary: employee.salary,
            complaint_count: employee.complaint_count,
            compliment_count: employee.compliment_count,
            demotion_count: employee.demotion_count,
            termination_eligible: record.termination_eligible(),
            bonus_eligible: record.bonus_eligible(),
            completed_work,
            employee_type: employee.employee_type,
        })
    }
}
