//! Handler tests against a real Postgres. Each test creates its own schema in
//! the database named by `TEST_DATABASE_URL` and drops it afterwards.
//!
//! Run with `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.

use std::thread;
use std::time::Duration;

use actix::{Addr, SyncArbiter};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::PgConnection;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::schema::{customer_profiles, delivery_assignments, employees, menu_items, orders, transactions, users};
use crate::services::db_models::{CustomerProfile, Employee, MenuItem, Order, User};
use crate::services::db_utils::{PgActor, PgPool};
use crate::services::insertable::{NewCustomerProfile, NewEmployee, NewMenuItem, NewOrder, NewUser};
use crate::services::messages::{
    AddKbEntry, AssignDelivery, CloseAccount, CreditDeposit, FeedbackTarget, FetchFlaggedKb, FetchMenu, FileComplaint,
    FireEmployee, PlaceBid, PlaceOrder, ProcessComplaint, RateKbEntry, SetBlacklist, SubmitRegistration,
};
use crate::services::views::CheckoutResult;
use crate::types::{EmployeeType, OrderStatus, TargetType, TransactionType, UserType};

#[derive(Debug)]
struct SearchPath(String);

impl CustomizeConnection<PgConnection, diesel::r2d2::Error> for SearchPath {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!("SET search_path TO {}", self.0))
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

struct TestDb {
    url: String,
    schema: String,
    pool: PgPool,
}

impl TestDb {
    fn new() -> Self {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL is not set");
        let schema = format!("eats_test_{}", Uuid::new_v4().simple());

        PgConnection::establish(&url)
            .unwrap()
            .batch_execute(&format!("CREATE SCHEMA {schema}"))
            .unwrap();

        let pool = Pool::builder()
            .max_size(4)
            .connection_customizer(Box::new(SearchPath(schema.clone())))
            .build(ConnectionManager::new(url.as_str()))
            .unwrap();

        let mut conn = pool.get().unwrap();
        conn.batch_execute(include_str!("../../migrations/2024-11-20-000000_create_tables/up.sql"))
            .unwrap();
        conn.batch_execute(include_str!("../../migrations/2024-11-21-000000_account_closure/up.sql"))
            .unwrap();

        Self { url, schema, pool }
    }

    fn actor(&self) -> Addr<PgActor> {
        let pool = self.pool.clone();
        SyncArbiter::start(2, move || PgActor(pool.clone()))
    }

    fn conn(&self) -> diesel::r2d2::PooledConnection<ConnectionManager<PgConnection>> {
        self.pool.get().unwrap()
    }

    fn user(&self, username: &str, kind: UserType) -> User {
        diesel::insert_into(users::table)
            .values(NewUser {
                username: username.to_owned(),
                email: format!("{username}@example.com"),
                password_hash: "unused".to_owned(),
                first_name: String::new(),
                last_name: String::new(),
                user_type: kind.as_str().to_owned(),
            })
            .get_result::<User>(&mut self.conn())
            .unwrap()
    }

    fn customer(&self, username: &str, deposit_balance: i64) -> (User, CustomerProfile) {
        let user = self.user(username, UserType::Registered);
        let profile = diesel::insert_into(customer_profiles::table)
            .values(NewCustomerProfile { user_id: user.id })
            .get_result::<CustomerProfile>(&mut self.conn())
            .unwrap();
        diesel::update(customer_profiles::table.find(profile.id))
            .set(customer_profiles::deposit_balance.eq(deposit_balance))
            .execute(&mut self.conn())
            .unwrap();
        (user, self.profile(profile.id))
    }

    fn staff(&self, username: &str, kind: EmployeeType) -> Employee {
        let user = self.user(username, kind.into());
        diesel::insert_into(employees::table)
            .values(NewEmployee {
                user_id: user.id,
                employee_type: kind.as_str().to_owned(),
                salary: 400_000,
            })
            .get_result::<Employee>(&mut self.conn())
            .unwrap()
    }

    fn dish(&self, chef: &Employee, price: i64) -> MenuItem {
        diesel::insert_into(menu_items::table)
            .values(NewMenuItem {
                chef_id: chef.id,
                name: "Lamb tagine".to_owned(),
                description: String::new(),
                price,
                image_url: None,
                is_vip_exclusive: false,
            })
            .get_result::<MenuItem>(&mut self.conn())
            .unwrap()
    }

    fn ready_order(&self, profile: &CustomerProfile) -> Order {
        diesel::insert_into(orders::table)
            .values(NewOrder {
                customer_id: profile.id,
                delivery_address: "12 Harbour Road".to_owned(),
                subtotal: 1500,
                discount: 0,
                delivery_fee: 299,
                total_price: 1799,
                status: OrderStatus::Ready.as_str().to_owned(),
                is_free_delivery: false,
            })
            .get_result::<Order>(&mut self.conn())
            .unwrap()
    }

    fn profile(&self, profile_id: i64) -> CustomerProfile {
        customer_profiles::table
            .find(profile_id)
            .select(CustomerProfile::as_select())
            .first(&mut self.conn())
            .unwrap()
    }

    fn is_active(&self, user_id: i64) -> bool {
        users::table
            .find(user_id)
            .select(users::is_active)
            .first(&mut self.conn())
            .unwrap()
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        if let Ok(mut conn) = PgConnection::establish(&self.url) {
            let _ = conn.batch_execute(&format!("DROP SCHEMA {} CASCADE", self.schema));
        }
    }
}

fn order_of(user: &User, dish: &MenuItem) -> PlaceOrder {
    PlaceOrder {
        user_id: user.id,
        lines: vec![(dish.id, 1)],
        delivery_address: Some("12 Harbour Road".to_owned()),
        delivery_fee: 0,
    }
}

#[actix_web::test]
#[ignore = "needs a throwaway Postgres in TEST_DATABASE_URL"]
async fn refused_checkout_still_records_the_warning() {
    let db = TestDb::new();
    let pg = db.actor();
    let chef = db.staff("chef", EmployeeType::Chef);
    let dish = db.dish(&chef, 1000);
    let (user, profile) = db.customer("amira", 500);

    let result = pg.send(order_of(&user, &dish)).await.unwrap().unwrap();
    assert!(matches!(result, CheckoutResult::Refused { .. }));

    let profile = db.profile(profile.id);
    assert_eq!(profile.warnings_count, 1);
    assert_eq!(profile.deposit_balance, 500);
    let placed: i64 = orders::table.count().get_result(&mut db.conn()).unwrap();
    assert_eq!(placed, 0);
}

#[actix_web::test]
#[ignore = "needs a throwaway Postgres in TEST_DATABASE_URL"]
async fn checkout_waits_for_a_deposit_in_flight() {
    let db = TestDb::new();
    let pg = db.actor();
    let chef = db.staff("chef", EmployeeType::Chef);
    let dish = db.dish(&chef, 1000);
    let (user, profile) = db.customer("amira", 2000);

    let mut other = db.conn();
    other
        .batch_execute(&format!(
            "BEGIN; UPDATE customer_profiles SET deposit_balance = deposit_balance + 5000 WHERE id = {}",
            profile.id
        ))
        .unwrap();
    let committer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(500));
        other.batch_execute("COMMIT").unwrap();
    });

    let result = pg.send(order_of(&user, &dish)).await.unwrap().unwrap();
    committer.join().unwrap();

    match result {
        CheckoutResult::Placed(placed) => assert_eq!(placed.new_balance, 6000),
        CheckoutResult::Refused { message } => panic!("order refused: {message}"),
    }
    assert_eq!(db.profile(profile.id).deposit_balance, 6000);
}

#[actix_web::test]
#[ignore = "needs a throwaway Postgres in TEST_DATABASE_URL"]
async fn racing_order_and_deposit_both_count() {
    let db = TestDb::new();
    let pg = db.actor();
    let chef = db.staff("chef", EmployeeType::Chef);
    let dish = db.dish(&chef, 1000);

    for round in 0..5 {
        let (user, profile) = db.customer(&format!("racer{round}"), 2000);
        let deposit = CreditDeposit {
            user_id: user.id,
            amount: 5000,
            payment_intent_id: format!("pi_race_{round}"),
        };

        let (placed, credited) = futures::join!(pg.send(order_of(&user, &dish)), pg.send(deposit));
        assert!(matches!(placed.unwrap().unwrap(), CheckoutResult::Placed(_)));
        credited.unwrap().unwrap();

        assert_eq!(db.profile(profile.id).deposit_balance, 6000, "round {round}");
    }
}

#[actix_web::test]
#[ignore = "needs a throwaway Postgres in TEST_DATABASE_URL"]
async fn deposit_is_credited_once_per_payment() {
    let db = TestDb::new();
    let pg = db.actor();
    let (user, profile) = db.customer("amira", 0);

    let credit = || CreditDeposit {
        user_id: user.id,
        amount: 2500,
        payment_intent_id: "pi_3OkTwice".to_owned(),
    };

    let first = pg.send(credit()).await.unwrap().unwrap();
    assert_eq!(first.new_balance, 2500);

    let again = pg.send(credit()).await.unwrap().unwrap_err();
    assert!(matches!(again, ServiceError::Conflict(_)));
    assert_eq!(db.profile(profile.id).deposit_balance, 2500);
}

#[actix_web::test]
#[ignore = "needs a throwaway Postgres in TEST_DATABASE_URL"]
async fn dismissed_complaint_warns_the_complainant() {
    let db = TestDb::new();
    let pg = db.actor();
    let manager = db.user("boss", UserType::Manager);
    let chef = db.staff("chef", EmployeeType::Chef);
    let (user, profile) = db.customer("amira", 0);

    let complaint = pg
        .send(FileComplaint {
            author_id: user.id,
            target: FeedbackTarget::Employee(TargetType::Chef, chef.id),
            order_id: None,
            description: "The soup was cold".to_owned(),
        })
        .await
        .unwrap()
        .unwrap();

    let decision = pg
        .send(ProcessComplaint {
            manager_id: manager.id,
            complaint_id: complaint.id,
            upheld: false,
            notes: None,
        })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(decision.status, "dismissed");
    assert_eq!(db.profile(profile.id).warnings_count, 1);
}

#[actix_web::test]
#[ignore = "needs a throwaway Postgres in TEST_DATABASE_URL"]
async fn courier_bids_once_per_order() {
    let db = TestDb::new();
    let pg = db.actor();
    let courier = db.staff("rider", EmployeeType::Delivery);
    let (_, profile) = db.customer("amira", 0);
    let order = db.ready_order(&profile);

    let bid = |bid_amount| PlaceBid {
        user_id: courier.user_id,
        order_id: order.id,
        bid_amount,
    };

    pg.send(bid(500)).await.unwrap().unwrap();
    let again = pg.send(bid(450)).await.unwrap().unwrap_err();
    assert!(matches!(again, ServiceError::Conflict(_)));
}

#[actix_web::test]
#[ignore = "needs a throwaway Postgres in TEST_DATABASE_URL"]
async fn passing_over_the_lowest_bid_needs_a_memo() {
    let db = TestDb::new();
    let pg = db.actor();
    let manager = db.user("boss", UserType::Manager);
    let cheap = db.staff("cheap", EmployeeType::Delivery);
    let pricey = db.staff("pricey", EmployeeType::Delivery);
    let (_, profile) = db.customer("amira", 0);
    let order = db.ready_order(&profile);

    pg.send(PlaceBid {
        user_id: cheap.user_id,
        order_id: order.id,
        bid_amount: 500,
    })
    .await
    .unwrap()
    .unwrap();
    let chosen = pg
        .send(PlaceBid {
            user_id: pricey.user_id,
            order_id: order.id,
            bid_amount: 800,
        })
        .await
        .unwrap()
        .unwrap();

    let assign = |memo: Option<&str>| AssignDelivery {
        manager_id: manager.id,
        order_id: order.id,
        bid_id: chosen.id,
        justification_memo: memo.map(str::to_owned),
    };

    let refused = pg.send(assign(Some("  "))).await.unwrap().unwrap_err();
    assert!(matches!(refused, ServiceError::BadRequest(_)));

    let result = pg.send(assign(Some("Rides a scooter, much faster"))).await.unwrap().unwrap();
    assert!(!result.is_lowest_bid);
    assert_eq!(result.delivery_person_id, pricey.id);

    let memo: Option<String> = delivery_assignments::table
        .filter(delivery_assignments::order_id.eq(order.id))
        .select(delivery_assignments::justification_memo)
        .first(&mut db.conn())
        .unwrap();
    assert_eq!(memo.as_deref(), Some("Rides a scooter, much faster"));

    let courier: Option<i64> = orders::table
        .find(order.id)
        .select(orders::delivery_person_id)
        .first(&mut db.conn())
        .unwrap();
    assert_eq!(courier, Some(pricey.id));
}

#[actix_web::test]
#[ignore = "needs a throwaway Postgres in TEST_DATABASE_URL"]
async fn zero_rating_flags_a_kb_entry() {
    let db = TestDb::new();
    let pg = db.actor();
    let chef = db.staff("chef", EmployeeType::Chef);
    let (user, _) = db.customer("amira", 0);

    let entry = pg
        .send(AddKbEntry {
            user_id: chef.user_id,
            question: "Do you deliver after midnight?".to_owned(),
            answer: "Only on weekends.".to_owned(),
        })
        .await
        .unwrap()
        .unwrap();

    let rated = pg
        .send(RateKbEntry {
            user_id: user.id,
            entry_id: entry.id,
            rating: 0,
        })
        .await
        .unwrap()
        .unwrap();
    assert!(rated.entry.is_flagged);

    let flagged = pg.send(FetchFlaggedKb).await.unwrap().unwrap();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].entry.id, entry.id);
}

#[actix_web::test]
#[ignore = "needs a throwaway Postgres in TEST_DATABASE_URL"]
async fn blacklisted_email_cannot_register_again() {
    let db = TestDb::new();
    let pg = db.actor();
    let (user, profile) = db.customer("amira", 0);

    pg.send(SetBlacklist {
        customer_id: profile.id,
        blacklisted: true,
    })
    .await
    .unwrap()
    .unwrap();

    let refused = pg
        .send(SubmitRegistration {
            username: "amira2".to_owned(),
            email: user.email.clone(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "unused".to_owned(),
        })
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(refused, ServiceError::Forbidden(_)));
}

#[actix_web::test]
#[ignore = "needs a throwaway Postgres in TEST_DATABASE_URL"]
async fn manager_blacklist_clears_the_deposit() {
    let db = TestDb::new();
    let pg = db.actor();
    let (user, profile) = db.customer("amira", 3000);
    diesel::update(customer_profiles::table.find(profile.id))
        .set(customer_profiles::warnings_count.eq(2))
        .execute(&mut db.conn())
        .unwrap();

    let view = pg
        .send(SetBlacklist {
            customer_id: profile.id,
            blacklisted: true,
        })
        .await
        .unwrap()
        .unwrap();
    assert!(view.is_blacklisted);
    assert!(!view.is_active);
    assert_eq!(view.deposit_balance, 0);

    let closures: Vec<i64> = transactions::table
        .filter(transactions::user_id.eq(user.id))
        .filter(transactions::transaction_type.eq(TransactionType::AccountClosure.as_str()))
        .select(transactions::amount)
        .load(&mut db.conn())
        .unwrap();
    assert_eq!(closures, vec![-3000]);

    let view = pg
        .send(SetBlacklist {
            customer_id: profile.id,
            blacklisted: false,
        })
        .await
        .unwrap()
        .unwrap();
    assert!(!view.is_blacklisted);
    assert!(view.is_active);
    assert_eq!(view.warnings_count, 0);
}

#[actix_web::test]
#[ignore = "needs a throwaway Postgres in TEST_DATABASE_URL"]
async fn lifting_a_blacklist_keeps_a_closed_account_closed() {
    let db = TestDb::new();
    let pg = db.actor();
    let (user, profile) = db.customer("amira", 1200);

    let closed = pg
        .send(CloseAccount {
            customer_id: profile.id,
            reason: "Requested by customer".to_owned(),
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(closed.cleared_amount, 1200);

    for blacklisted in [true, false] {
        pg.send(SetBlacklist {
            customer_id: profile.id,
            blacklisted,
        })
        .await
        .unwrap()
        .unwrap();
    }

    assert!(!db.is_active(user.id));
    assert!(db.profile(profile.id).closed_at.is_some());

    let again = pg
        .send(CloseAccount {
            customer_id: profile.id,
            reason: "Twice".to_owned(),
        })
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(again, ServiceError::Conflict(_)));
}

#[actix_web::test]
#[ignore = "needs a throwaway Postgres in TEST_DATABASE_URL"]
async fn fired_chef_dishes_leave_the_menu() {
    let db = TestDb::new();
    let pg = db.actor();
    let chef = db.staff("chef", EmployeeType::Chef);
    let dish = db.dish(&chef, 1000);
    let (user, _) = db.customer("amira", 5000);

    let menu = pg.send(FetchMenu).await.unwrap().unwrap();
    assert!(menu.iter().any(|entry| entry.id == dish.id));

    pg.send(FireEmployee {
        employee_id: chef.id,
        employee_type: Some(EmployeeType::Chef),
    })
    .await
    .unwrap()
    .unwrap();

    let menu = pg.send(FetchMenu).await.unwrap().unwrap();
    assert!(menu.iter().all(|entry| entry.id != dish.id));

    let refused = pg.send(order_of(&user, &dish)).await.unwrap().unwrap_err();
    assert!(matches!(refused, ServiceError::NotFound(_)));
}
