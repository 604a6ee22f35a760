use chrono::NaiveDateTime;
use diesel::{Queryable, Selectable};
use serde::Serialize;

use crate::rules::{CustomerStanding, StaffRecord};
use crate::types::{as_dollars, average, UserType};

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::users)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: String,
    pub can_contribute_knowledge: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl User {
    /// Rows only ever hold values written through `UserType::as_str`.
    pub fn role(&self) -> UserType {
        self.user_type.parse().unwrap_or(UserType::Registered)
    }
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::customer_profiles)]
pub struct CustomerProfile {
    pub id: i64,
    pub user_id: i64,
    pub warnings_count: i32,
    pub order_count: i32,
    #[serde(serialize_with = "as_dollars")]
    pub total_spent: i64,
    #[serde(serialize_with = "as_dollars")]
    pub deposit_balance: i64,
    pub is_blacklisted: bool,
    pub vip_free_deliveries_remaining: i32,
    pub default_address: Option<String>,
    pub closed_at: Option<NaiveDateTime>,
}

impl CustomerProfile {
    pub fn standing(&self, user_type: UserType) -> CustomerStanding {
        CustomerStanding {
            user_type,
            warnings_count: self.warnings_count,
            deposit_balance: self.deposit_balance,
            total_spent: self.total_spent,
            order_count: self.order_count,
            is_blacklisted: self.is_blacklisted,
            vip_free_deliveries_remaining: self.vip_free_deliveries_remaining,
        }
    }
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::employees)]
pub struct Employee {
    pub id: i64,
    pub user_id: i64,
    pub employee_type: String,
    #[serde(serialize_with = "as_dollars")]
    pub salary: i64,
    pub complaint_count: i32,
    pub compliment_count: i32,
    pub demotion_count: i32,
    #[serde(skip)]
    pub rating_sum: i64,
    #[serde(skip)]
    pub rating_count: i64,
    pub is_active: bool,
    pub hired_at: NaiveDateTime,
}

impl Employee {
    pub fn record(&self) -> StaffRecord {
        StaffRecord {
            salary: self.salary,
            complaint_count: self.complaint_count,
            compliment_count: self.compliment_count,
            demotion_count: self.demotion_count,
        }
    }

    pub fn average_rating(&self) -> Option<f64> {
        average(self.rating_sum, self.rating_count)
    }
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::menu_items)]
pub struct MenuItem {
    pub id: i64,
    pub chef_id: i64,
    pub name: String,
    pub description: String,
    #[serde(serialize_with = "as_dollars")]
    pub price: i64,
    pub image_url: Option<String>,
    pub is_vip_exclusive: bool,
    #[serde(skip)]
    pub rating_sum: i64,
    #[serde(skip)]
    pub rating_count: i64,
    pub total_orders: i64,
    pub is_available: bool,
    pub created_at: NaiveDateTime,
}

impl MenuItem {
    pub fn average_rating(&self) -> Option<f64> {
        average(self.rating_sum, self.rating_count)
    }
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::orders)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub delivery_address: String,
    #[serde(serialize_with = "as_dollars")]
    pub subtotal: i64,
    #[serde(serialize_with = "as_dollars")]
    pub discount: i64,
    #[serde(serialize_with = "as_dollars")]
    pub delivery_fee: i64,
    #[serde(serialize_with = "as_dollars")]
    pub total_price: i64,
    pub status: String,
    pub is_free_delivery: bool,
    pub delivery_person_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub delivered_at: Option<NaiveDateTime>,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::order_items)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub menu_item_id: i64,
    pub quantity: i32,
    #[serde(serialize_with = "as_dollars")]
    pub price_at_time: i64,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::food_ratings)]
pub struct FoodRating {
    pub id: i64,
    pub order_item_id: i64,
    pub customer_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::delivery_ratings)]
pub struct DeliveryRating {
    pub id: i64,
    pub order_id: i64,
    pub customer_id: i64,
    pub delivery_person_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::delivery_bids)]
pub struct DeliveryBid {
    pub id: i64,
    pub order_id: i64,
    pub delivery_person_id: i64,
    #[serde(serialize_with = "as_dollars")]
    pub bid_amount: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::delivery_assignments)]
pub struct DeliveryAssignment {
    pub id: i64,
    pub order_id: i64,
    pub delivery_person_id: i64,
    pub assigned_by: i64,
    pub winning_bid_id: i64,
    pub justification_memo: Option<String>,
    pub assigned_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::complaints)]
pub struct Complaint {
    pub id: i64,
    pub complainant_id: i64,
    pub target_user_id: i64,
    pub target_type: String,
    pub order_id: Option<i64>,
    pub description: String,
    pub status: String,
    pub weight: i32,
    pub dispute_reason: Option<String>,
    pub manager_decision: Option<String>,
    pub processed_by: Option<i64>,
    pub created_at: NaiveDateTime,
    pub processed_at: Option<NaiveDateTime>,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::compliments)]
pub struct Compliment {
    pub id: i64,
    pub author_id: i64,
    pub target_user_id: i64,
    pub target_type: String,
    pub order_id: Option<i64>,
    pub description: String,
    pub status: String,
    pub weight: i32,
    pub processed_by: Option<i64>,
    pub created_at: NaiveDateTime,
    pub processed_at: Option<NaiveDateTime>,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::registration_requests)]
pub struct RegistrationRequest {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip)]
    pub password_hash: String,
    pub status: String,
    pub processed_by: Option<i64>,
    pub created_at: NaiveDateTime,
    pub processed_at: Option<NaiveDateTime>,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::transactions)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub transaction_type: String,
    #[serde(serialize_with = "as_dollars")]
    pub amount: i64,
    pub order_id: Option<i64>,
    pub payment_intent_id: Option<String>,
    #[serde(serialize_with = "as_dollars")]
    pub balance_after: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::kb_entries)]
pub struct KbEntry {
    pub id: i64,
    pub author_id: i64,
    pub question: String,
    pub answer: String,
    pub author_type: String,
    #[serde(skip)]
    pub rating_sum: i64,
    pub rating_count: i64,
    pub is_flagged: bool,
    pub is_removed: bool,
    pub created_at: NaiveDateTime,
}

impl KbEntry {
    pub fn average_rating(&self) -> Option<f64> {
        average(self.rating_sum, self.rating_count)
    }
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::discussion_topics)]
pub struct DiscussionTopic {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub body: String,
    pub topic_type: String,
    pub related_chef_id: Option<i64>,
    pub related_menu_item_id: Option<i64>,
    pub related_delivery_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize)]
#[diesel(table_name = crate::schema::discussion_posts)]
pub struct DiscussionPost {
    pub id: i64,
    pub topic_id: i64,
    pub author_id: i64,
    pub body: String,
    pub created_at: NaiveDateTime,
}
