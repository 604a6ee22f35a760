use std::collections::HashMap;

use actix::Handler;
use diesel::prelude::*;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::rules::{validate_bid_choice, validate_transition, StatusActor};
use crate::schema::{customer_profiles, delivery_assignments, delivery_bids, delivery_ratings, employees, order_items, orders, users};
use crate::services::db_models::{DeliveryBid, Employee, Order};
use crate::services::db_utils::PgActor;
use crate::services::insertable::{NewDeliveryAssignment, NewDeliveryBid};
use crate::services::messages::{
    AssignDelivery, DeliveryUpdateStatus, FetchAvailableOrders, FetchMyBids, FetchMyDeliveries, FetchPendingAssignments,
    PlaceBid,
};
use crate::services::views::{
    ActiveAndCompleted, AssignmentCandidate, AssignmentResult, AvailableOrder, BidView, DeliveryJob,
};
use crate::types::{cents_to_dollars, EmployeeType, OrderStatus};

use super::{employee_names, load_employee, load_user, now, order_lines, order_status};

/// Orders nobody has been assigned to yet and that are still on their way out.
fn open_orders(conn: &mut PgConnection) -> ServiceResult<Vec<(Order, String)>> {
    Ok(orders::table
        .inner_join(customer_profiles::table.inner_join(users::table))
        .filter(orders::delivery_person_id.is_null())
        .filter(orders::status.ne(OrderStatus::Delivered.as_str()))
        .order(orders::created_at.asc())
        .select((Order::as_select(), users::username))
        .load::<(Order, String)>(conn)?)
}

fn bids_for(conn: &mut PgConnection, order_ids: &[i64]) -> ServiceResult<Vec<DeliveryBid>> {
    Ok(delivery_bids::table
        .filter(delivery_bids::order_id.eq_any(order_ids))
        .order(delivery_bids::bid_amount.asc())
        .select(DeliveryBid::as_select())
        .load(conn)?)
}

fn lowest_bids(bids: &[DeliveryBid]) -> HashMap<i64, i64> {
    let mut lowest: HashMap<i64, i64> = HashMap::new();
    for bid in bids {
        lowest
            .entry(bid.order_id)
            .and_modify(|amount| *amount = (*amount).min(bid.bid_amount))
            .or_insert(bid.bid_amount);
    }
    lowest
}

fn lock_order(conn: &mut PgConnection, order_id: i64) -> ServiceResult<Order> {
    orders::table
        .find(order_id)
        .select(Order::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| ServiceError::not_found("Order not found"))
}

impl Handler<FetchAvailableOrders> for PgActor {
    type Result = ServiceResult<Vec<AvailableOrder>>;

    fn handle(&mut self, msg: FetchAvailableOrders, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;
        let courier = load_employee(&mut conn, msg.0, EmployeeType::Delivery)?;

        let open = open_orders(&mut conn)?;
        let ids: Vec<i64> = open.iter().map(|(order, _)| order.id).collect();
        let bids = bids_for(&mut conn, &ids)?;
        let lowest = lowest_bids(&bids);

        let mut item_counts: HashMap<i64, i64> = HashMap::new();
        for (order_id, quantity) in order_items::table
            .filter(order_items::order_id.eq_any(&ids))
            .select((order_items::order_id, order_items::quantity))
            .load::<(i64, i32)>(&mut conn)?
        {
            *item_counts.entry(order_id).or_default() += i64::from(quantity);
        }

        Ok(open
            .into_iter()
            .map(|(order, _)| {
                let order_bids: Vec<&DeliveryBid> = bids.iter().filter(|bid| bid.order_id == order.id).collect();
                AvailableOrder {
                    id: order.id,
                    status: order.status,
                    delivery_address: order.delivery_address,
                    item_count: item_counts.get(&order.id).copied().unwrap_or_default(),
                    total_price: order.total_price,
                    bid_count: order_bids.len(),
                    lowest_bid: lowest.get(&order.id).copied().map(cents_to_dollars),
                    my_bid: order_bids
                        .iter()
                        .find(|bid| bid.delivery_person_id == courier.id)
                        .map(|bid| cents_to_dollars(bid.bid_amount)),
                    created_at: order.created_at,
                }
            })
            .collect())
    }
}

impl Handler<PlaceBid> for PgActor {
    type Result = ServiceResult<DeliveryBid>;

    fn handle(&mut self, msg: PlaceBid, _ctx: &mut Self::Context) -> Self::Result {
        if msg.bid_amount <= 0 {
            return Err(ServiceError::bad_request("Bid amount must be positive"));
        }

        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let courier = load_employee(conn, msg.user_id, EmployeeType::Delivery)?;
            let order = lock_order(conn, msg.order_id)?;

            if order.delivery_person_id.is_some() || order_status(&order)?.is_final() {
                return Err(ServiceError::bad_request("This order is no longer open for bidding"));
            }

            let existing: i64 = delivery_bids::table
                .filter(delivery_bids::order_id.eq(order.id))
                .filter(delivery_bids::delivery_person_id.eq(courier.id))
                .count()
                .get_result(conn)?;
            if existing > 0 {
                return Err(ServiceError::conflict("You have already placed a bid on this order"));
            }

            let bid = diesel::insert_into(delivery_bids::table)
                .values(NewDeliveryBid {
                    order_id: order.id,
                    delivery_person_id: courier.id,
                    bid_amount: msg.bid_amount,
                })
                .get_result::<DeliveryBid>(conn)?;

            info!(order_id = order.id, courier_id = courier.id, amount = bid.bid_amount, "Bid placed");
            Ok(bid)
        })
    }
}

impl Handler<FetchMyBids> for PgActor {
    type Result = ServiceResult<Vec<BidView>>;

    fn handle(&mut self, msg: FetchMyBids, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;
        let courier = load_employee(&mut conn, msg.0, EmployeeType::Delivery)?;
        let name = load_user(&mut conn, msg.0)?.username;

        let mine = delivery_bids::table
            .inner_join(orders::table)
            .filter(delivery_bids::delivery_person_id.eq(courier.id))
            .order(delivery_bids::created_at.desc())
            .select((DeliveryBid::as_select(), Order::as_select()))
            .load::<(DeliveryBid, Order)>(&mut conn)?;

        let ids: Vec<i64> = mine.iter().map(|(bid, _)| bid.order_id).collect();
        let lowest = lowest_bids(&bids_for(&mut conn, &ids)?);

        Ok(mine
            .iter()
            .map(|(bid, order)| {
                let floor = lowest.get(&bid.order_id).copied().unwrap_or(bid.bid_amount);
                BidView::new(bid, &name, floor, order)
            })
            .collect())
    }
}

impl Handler<FetchMyDeliveries> for PgActor {
    type Result = ServiceResult<ActiveAndCompleted<DeliveryJob>>;

    fn handle(&mut self, msg: FetchMyDeliveries, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;
        let courier = load_employee(&mut conn, msg.0, EmployeeType::Delivery)?;

        let rows = orders::table
            .inner_join(customer_profiles::table.inner_join(users::table))
            .filter(orders::delivery_person_id.eq(courier.id))
            .order(orders::updated_at.desc())
            .select((Order::as_select(), users::username))
            .load::<(Order, String)>(&mut conn)?;

        let ids: Vec<i64> = rows.iter().map(|(order, _)| order.id).collect();
        let mut lines = order_lines(&mut conn, &ids)?;

        let my_bids: HashMap<i64, i64> = delivery_bids::table
            .filter(delivery_bids::order_id.eq_any(&ids))
            .filter(delivery_bids::delivery_person_id.eq(courier.id))
            .select((delivery_bids::order_id, delivery_bids::bid_amount))
            .load::<(i64, i64)>(&mut conn)?
            .into_iter()
            .collect();
        let ratings: HashMap<i64, i32> = delivery_ratings::table
            .filter(delivery_ratings::order_id.eq_any(&ids))
            .select((delivery_ratings::order_id, delivery_ratings::rating))
            .load::<(i64, i32)>(&mut conn)?
            .into_iter()
            .collect();

        let mut jobs = ActiveAndCompleted {
            active: Vec::new(),
            completed: Vec::new(),
        };
        for (order, customer) in rows {
            let done = order_status(&order)?.is_final();
            let job = DeliveryJob {
                id: order.id,
                status: order.status,
                customer,
                delivery_address: order.delivery_address,
                items: lines.remove(&order.id).unwrap_or_default(),
                bid_amount: my_bids.get(&order.id).copied().map(cents_to_dollars),
                rating: ratings.get(&order.id).copied(),
                created_at: order.created_at,
                delivered_at: order.delivered_at,
            };
            if done {
                jobs.completed.push(job);
            } else {
                jobs.active.push(job);
            }
        }

        Ok(jobs)
    }
}

impl Handler<DeliveryUpdateStatus> for PgActor {
    type Result = ServiceResult<Order>;

    fn handle(&mut self, msg: DeliveryUpdateStatus, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let courier = load_employee(conn, msg.user_id, EmployeeType::Delivery)?;
            let order = lock_order(conn, msg.order_id)?;

            if order.delivery_person_id != Some(courier.id) {
                return Err(ServiceError::forbidden("This order is not assigned to you"));
            }
            validate_transition(order_status(&order)?, msg.status, StatusActor::Delivery)?;

            let stamp = now();
            let delivered_at = if msg.status == OrderStatus::Delivered {
                Some(stamp)
            } else {
                order.delivered_at
            };

            let order = diesel::update(orders::table.find(order.id))
                .set((
                    orders::status.eq(msg.status.as_str()),
                    orders::updated_at.eq(stamp),
                    orders::delivered_at.eq(delivered_at),
                ))
                .get_result::<Order>(conn)?;

            info!(order_id = order.id, status = %msg.status, "Courier updated order status");
            Ok(order)
        })
    }
}

impl Handler<FetchPendingAssignments> for PgActor {
    type Result = ServiceResult<Vec<AssignmentCandidate>>;

    fn handle(&mut self, _msg: FetchPendingAssignments, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let open = open_orders(&mut conn)?;
        let ids: Vec<i64> = open.iter().map(|(order, _)| order.id).collect();
        let bids = bids_for(&mut conn, &ids)?;
        let lowest = lowest_bids(&bids);

        let couriers: Vec<i64> = bids.iter().map(|bid| bid.delivery_person_id).collect();
        let names = employee_names(&mut conn, &couriers)?;

        Ok(open
            .into_iter()
            .filter(|(order, _)| lowest.contains_key(&order.id))
            .map(|(order, customer)| {
                let floor = lowest[&order.id];
                let order_bids = bids
                    .iter()
                    .filter(|bid| bid.order_id == order.id)
                    .map(|bid| {
                        let courier = names.get(&bid.delivery_person_id).map(String::as_str).unwrap_or_default();
                        BidView::new(bid, courier, floor, &order)
                    })
                    .collect();

                AssignmentCandidate {
                    id: order.id,
                    status: order.status,
                    customer,
                    delivery_address: order.delivery_address,
                    total_price: order.total_price,
                    bids: order_bids,
                    created_at: order.created_at,
                }
            })
            .collect())
    }
}

impl Handler<AssignDelivery> for PgActor {
    type Result = ServiceResult<AssignmentResult>;

    fn handle(&mut self, msg: AssignDelivery, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        conn.build_transaction().run::<_, ServiceError, _>(|conn| {
            let order = lock_order(conn, msg.order_id)?;
            if order.delivery_person_id.is_some() {
                return Err(ServiceError::conflict("This order already has a delivery person"));
            }
            if order_status(&order)?.is_final() {
                return Err(ServiceError::bad_request("This order has already been delivered"));
            }

            let bids = bids_for(conn, &[order.id])?;
            let chosen = bids
                .iter()
                .find(|bid| bid.id == msg.bid_id)
                .ok_or_else(|| ServiceError::not_found("Bid not found for this order"))?;

            let amounts: Vec<i64> = bids.iter().map(|bid| bid.bid_amount).collect();
            let memo = msg.justification_memo.as_deref().map(str::trim).filter(|memo| !memo.is_empty());
            let is_lowest_bid = validate_bid_choice(chosen.bid_amount, &amounts, memo)?;

            let courier = employees::table
                .find(chosen.delivery_person_id)
                .select(Employee::as_select())
                .first(conn)?;
            if !courier.is_active {
                return Err(ServiceError::bad_request("This delivery person is no longer employed"));
            }

            diesel::insert_into(delivery_assignments::table)
                .values(NewDeliveryAssignment {
                    order_id: order.id,
                    delivery_person_id: courier.id,
                    assigned_by: msg.manager_id,
                    winning_bid_id: chosen.id,
                    justification_memo: memo.map(str::to_owned),
                })
                .execute(conn)?;

            diesel::update(orders::table.find(order.id))
                .set((orders::delivery_person_id.eq(Some(courier.id)), orders::updated_at.eq(now())))
                .execute(conn)?;

            info!(
                order_id = order.id,
                courier_id = courier.id,
                bid_id = chosen.id,
                is_lowest_bid,
                "Delivery assigned"
            );

            let message = if is_lowest_bid {
                "Delivery assigned to the lowest bidder".to_owned()
            } else {
                "Delivery assigned with a justification memo".to_owned()
            };

            Ok(AssignmentResult {
                order_id: order.id,
                delivery_person_id: courier.id,
                bid_id: chosen.id,
                is_lowest_bid,
                message,
            })
        })
    }
}
