use diesel::Insertable;

use crate::schema::{
    complaints, compliments, customer_profiles, delivery_assignments, delivery_bids,
    delivery_ratings, discussion_posts, discussion_topics, employees, food_ratings, kb_entries,
    kb_ratings, menu_items, order_items, orders, registration_requests, transactions, users,
};

#[derive(Insertable, Clone)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: String,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = customer_profiles)]
pub struct NewCustomerProfile {
    pub user_id: i64,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = employees)]
pub struct NewEmployee {
    pub user_id: i64,
    pub employee_type: String,
    pub salary: i64,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = menu_items)]
pub struct NewMenuItem {
    pub chef_id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub image_url: Option<String>,
    pub is_vip_exclusive: bool,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub customer_id: i64,
    pub delivery_address: String,
    pub subtotal: i64,
    pub discount: i64,
    pub delivery_fee: i64,
    pub total_price: i64,
    pub status: String,
    pub is_free_delivery: bool,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = order_items)]
pub struct NewOrderItem {
    pub order_id: i64,
    pub menu_item_id: i64,
    pub quantity: i32,
    pub price_at_time: i64,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = food_ratings)]
pub struct NewFoodRating {
    pub order_item_id: i64,
    pub customer_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = delivery_ratings)]
pub struct NewDeliveryRating {
    pub order_id: i64,
    pub customer_id: i64,
    pub delivery_person_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = delivery_bids)]
pub struct NewDeliveryBid {
    pub order_id: i64,
    pub delivery_person_id: i64,
    pub bid_amount: i64,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = delivery_assignments)]
pub struct NewDeliveryAssignment {
    pub order_id: i64,
    pub delivery_person_id: i64,
    pub assigned_by: i64,
    pub winning_bid_id: i64,
    pub justification_memo: Option<String>,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = complaints)]
pub struct NewComplaint {
    pub complainant_id: i64,
    pub target_user_id: i64,
    pub target_type: String,
    pub order_id: Option<i64>,
    pub description: String,
    pub status: String,
    pub weight: i32,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = compliments)]
pub struct NewCompliment {
    pub author_id: i64,
    pub target_user_id: i64,
    pub target_type: String,
    pub order_id: Option<i64>,
    pub description: String,
    pub status: String,
    pub weight: i32,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = registration_requests)]
pub struct NewRegistrationRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub status: String,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = transactions)]
pub struct NewTransaction {
    pub user_id: i64,
    pub transaction_type: String,
    pub amount: i64,
    pub order_id: Option<i64>,
    pub payment_intent_id: Option<String>,
    pub balance_after: i64,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = kb_entries)]
pub struct NewKbEntry {
    pub author_id: i64,
    pub question: String,
    pub answer: String,
    pub author_type: String,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = kb_ratings)]
pub struct NewKbRating {
    pub entry_id: i64,
    pub user_id: i64,
    pub rating: i32,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = discussion_topics)]
pub struct NewDiscussionTopic {
    pub author_id: i64,
    pub title: String,
    pub body: String,
    pub topic_type: String,
    pub related_chef_id: Option<i64>,
    pub related_menu_item_id: Option<i64>,
    pub related_delivery_id: Option<i64>,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = discussion_posts)]
pub struct NewDiscussionPost {
    pub topic_id: i64,
    pub author_id: i64,
    pub body: String,
}
