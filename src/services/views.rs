//! JSON shapes returned by the API that do not map one-to-one onto a table.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::chatbot::KnowledgeSnippet;
use crate::rules::max_warnings;
use crate::services::db_models::{
    Complaint, Compliment, CustomerProfile, DeliveryBid, Employee, KbEntry, MenuItem, Order, User,
};
use crate::types::{as_dollars, cents_to_dollars, OrderStatus, UserType};

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub user_type: UserType,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            user_type: user.role(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EmployeeView {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    #[serde(rename = "type")]
    pub employee_type: String,
    #[serde(serialize_with = "as_dollars")]
    pub salary: i64,
    pub complaint_count: i32,
    pub compliment_count: i32,
    pub demotion_count: i32,
    pub average_rating: Option<f64>,
    pub is_active: bool,
    pub termination_eligible: bool,
    pub bonus_eligible: bool,
    pub hired_at: NaiveDateTime,
}

impl EmployeeView {
    pub fn new(employee: &Employee, user: &User) -> Self {
        let record = employee.record();
        Self {
            id: employee.id,
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            employee_type: employee.employee_type.clone(),
            salary: employee.salary,
            complaint_count: employee.complaint_count,
            compliment_count: employee.compliment_count,
            demotion_count: employee.demotion_count,
            average_rating: employee.average_rating(),
            is_active: employee.is_active,
            termination_eligible: record.termination_eligible(),
            bonus_eligible: record.bonus_eligible(),
            hired_at: employee.hired_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
    pub can_contribute_knowledge: bool,
    pub customer: Option<CustomerProfile>,
    pub employee: Option<EmployeeView>,
}

#[derive(Debug, Serialize)]
pub struct CustomerView {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub user_type: UserType,
    pub warnings_count: i32,
    pub max_warnings: i32,
    pub order_count: i32,
    #[serde(serialize_with = "as_dollars")]
    pub total_spent: i64,
    #[serde(serialize_with = "as_dollars")]
    pub deposit_balance: i64,
    pub is_blacklisted: bool,
    pub is_active: bool,
}

impl CustomerView {
    pub fn new(profile: &CustomerProfile, user: &User) -> Self {
        Self {
            id: profile.id,
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            user_type: user.role(),
            warnings_count: profile.warnings_count,
            max_warnings: max_warnings(user.role()),
            order_count: profile.order_count,
            total_spent: profile.total_spent,
            deposit_balance: profile.deposit_balance,
            is_blacklisted: profile.is_blacklisted,
            is_active: user.is_active,
        }
    }
}

/// Cached in redis, so it must round-trip through JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub is_vip_exclusive: bool,
    pub average_rating: Option<f64>,
    pub total_orders: i64,
    pub chef_id: i64,
    pub chef_name: String,
}

impl MenuEntry {
    pub fn new(item: &MenuItem, chef_name: &str) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            price: cents_to_dollars(item.price),
            image_url: item.image_url.clone(),
            is_vip_exclusive: item.is_vip_exclusive,
            average_rating: item.average_rating(),
            total_orders: item.total_orders,
            chef_id: item.chef_id,
            chef_name: chef_name.to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChefMenuItem {
    #[serde(flatten)]
    pub item: MenuItem,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct OrderLineView {
    pub order_item_id: i64,
    pub menu_item_id: i64,
    pub name: String,
    pub quantity: i32,
    #[serde(serialize_with = "as_dollars")]
    pub price: i64,
    pub rated: bool,
}

#[derive(Debug, Serialize)]
pub struct OrderPlaced {
    pub order_id: i64,
    #[serde(serialize_with = "as_dollars")]
    pub subtotal: i64,
    #[serde(serialize_with = "as_dollars")]
    pub discount: i64,
    #[serde(serialize_with = "as_dollars")]
    pub delivery_fee: i64,
    #[serde(serialize_with = "as_dollars")]
    pub total_price: i64,
    #[serde(serialize_with = "as_dollars")]
    pub new_balance: i64,
    pub is_free_delivery: bool,
    pub promoted_to_vip: bool,
    pub status: OrderStatus,
}

#[derive(Debug)]
pub enum CheckoutResult {
    Placed(OrderPlaced),
    Refused { message: String },
}

#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub order_id: i64,
    pub items_summary: String,
    pub items: Vec<OrderLineView>,
    #[serde(serialize_with = "as_dollars")]
    pub total_price: i64,
    pub status: String,
    pub date: String,
    pub delivery_address: String,
    pub delivery_person_id: Option<i64>,
    pub delivery_rated: bool,
}

#[derive(Debug, Serialize)]
pub struct DepositCredited {
    #[serde(serialize_with = "as_dollars")]
    pub amount: i64,
    #[serde(serialize_with = "as_dollars")]
    pub new_balance: i64,
}

#[derive(Debug, Serialize)]
pub struct KitchenOrder {
    pub id: i64,
    pub status: String,
    pub customer: String,
    pub delivery_address: String,
    pub items: Vec<OrderLineView>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct ActiveAndCompleted<T: Serialize> {
    pub active: Vec<T>,
    pub completed: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct RatingView {
    pub id: i64,
    pub menu_item: String,
    pub customer: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct ChefRatings {
    pub average_rating: Option<f64>,
    pub ratings: Vec<RatingView>,
}

#[derive(Debug, Serialize)]
pub struct StaffStats {
    pub employee_type: String,
    #[serde(serialize_with = "as_dollars")]
    pub salary: i64,
    pub average_rating: Option<f64>,
    pub rating_count: i64,
    pub complaint_count: i32,
    pub compliment_count: i32,
    pub demotion_count: i32,
    pub termination_eligible: bool,
    pub bonus_eligible: bool,
    /// Dishes on the menu for chefs, deliveries completed for couriers.
    pub completed_work: i64,
}

#[derive(Debug, Serialize)]
pub struct BidView {
    pub id: i64,
    pub order_id: i64,
    pub delivery_person_id: i64,
    pub delivery_person: String,
    #[serde(serialize_with = "as_dollars")]
    pub bid_amount: i64,
    /// Same figure as `bid_amount`, under the name the manager view sorts by.
    pub amount: f64,
    pub is_lowest: bool,
    pub order_status: String,
    pub won: Option<bool>,
    pub created_at: NaiveDateTime,
}

impl BidView {
    pub fn new(bid: &DeliveryBid, courier: &str, lowest: i64, order: &Order) -> Self {
        Self {
            id: bid.id,
            order_id: bid.order_id,
            delivery_person_id: bid.delivery_person_id,
            delivery_person: courier.to_owned(),
            bid_amount: bid.bid_amount,
            amount: cents_to_dollars(bid.bid_amount),
            is_lowest: bid.bid_amount <= lowest,
            order_status: order.status.clone(),
            won: order
                .delivery_person_id
                .map(|assigned| assigned == bid.delivery_person_id),
            created_at: bid.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AvailableOrder {
    pub id: i64,
    pub status: String,
    pub delivery_address: String,
    pub item_count: i64,
    #[serde(serialize_with = "as_dollars")]
    pub total_price: i64,
    pub bid_count: usize,
    pub lowest_bid: Option<f64>,
    pub my_bid: Option<f64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct DeliveryJob {
    pub id: i64,
    pub status: String,
    pub customer: String,
    pub delivery_address: String,
    pub items: Vec<OrderLineView>,
    pub bid_amount: Option<f64>,
    pub rating: Option<i32>,
    pub created_at: NaiveDateTime,
    pub delivered_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentCandidate {
    pub id: i64,
    pub status: String,
    pub customer: String,
    pub delivery_address: String,
    #[serde(serialize_with = "as_dollars")]
    pub total_price: i64,
    pub bids: Vec<BidView>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct AssignmentResult {
    pub order_id: i64,
    pub delivery_person_id: i64,
    pub bid_id: i64,
    pub is_lowest_bid: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TargetOption {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackTargets {
    pub chefs: Vec<TargetOption>,
    pub delivery_people: Vec<TargetOption>,
    pub customers: Vec<TargetOption>,
}

#[derive(Debug, Serialize)]
pub struct ComplaintView {
    #[serde(flatten)]
    pub complaint: Complaint,
    pub complainant: String,
    pub target: String,
}

#[derive(Debug, Serialize)]
pub struct ComplimentView {
    #[serde(flatten)]
    pub compliment: Compliment,
    pub author: String,
    pub target: String,
}

#[derive(Debug, Serialize)]
pub struct MyFeedback {
    pub filed: Vec<ComplaintView>,
    pub received: Vec<ComplaintView>,
    pub compliments: Vec<ComplimentView>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackDecision {
    pub id: i64,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SalaryChange {
    pub employee_id: i64,
    #[serde(serialize_with = "as_dollars")]
    pub old_salary: i64,
    #[serde(serialize_with = "as_dollars")]
    pub new_salary: i64,
}

#[derive(Debug, Serialize)]
pub struct AccountClosed {
    pub customer_id: i64,
    #[serde(serialize_with = "as_dollars")]
    pub cleared_amount: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct KbEntryView {
    #[serde(flatten)]
    pub entry: KbEntry,
    pub author: String,
    pub average_rating: Option<f64>,
}

impl From<&KbEntry> for KnowledgeSnippet {
    fn from(entry: &KbEntry) -> Self {
        Self {
            id: entry.id,
            question: entry.question.clone(),
            answer: entry.answer.clone(),
            rating_sum: entry.rating_sum,
            rating_count: entry.rating_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TopicSummary {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub topic_type: String,
    pub author: String,
    pub reply_count: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: i64,
    pub author: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct TopicThread {
    pub post: TopicSummary,
    pub comments: Vec<PostView>,
}

#[derive(Debug, Serialize)]
pub struct TopicTypeCount {
    pub topic_type: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DiscussionSummary {
    pub total_topics: i64,
    pub total_replies: i64,
    pub by_type: Vec<TopicTypeCount>,
    pub recent: Vec<TopicSummary>,
}
