use actix::Message;

use crate::chatbot::KnowledgeSnippet;
use crate::error::ServiceResult;
use crate::rules::SalaryAction;
use crate::services::db_models::{
    Complaint, Compliment, DeliveryBid, DiscussionPost, DiscussionTopic, KbEntry, MenuItem, Order,
    RegistrationRequest, User,
};
use crate::services::views::{
    AccountClosed, ActiveAndCompleted, AssignmentCandidate, AssignmentResult, AvailableOrder, BidView,
    CheckoutResult, ChefMenuItem, ChefRatings, ComplaintView, ComplimentView, CustomerView,
    DeliveryJob, DepositCredited, DiscussionSummary, EmployeeView, FeedbackDecision,
    FeedbackTargets, KbEntryView, KitchenOrder, MenuEntry, MyFeedback, OrderSummary, ProfileView,
    SalaryChange, StaffStats, TopicSummary, TopicThread,
};
use crate::types::{EmployeeType, OrderStatus, TargetType, TopicType};

// accounts

#[derive(Message)]
#[rtype(result = "ServiceResult<User>")]
pub struct FetchUser(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<User>")]
pub struct FetchUserByUsername(pub String);

#[derive(Message)]
#[rtype(result = "ServiceResult<ProfileView>")]
pub struct FetchProfile(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<RegistrationRequest>")]
pub struct SubmitRegistration {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<RegistrationRequest>>")]
pub struct FetchRegistrations;

#[derive(Message)]
#[rtype(result = "ServiceResult<RegistrationRequest>")]
pub struct ProcessRegistration {
    pub request_id: i64,
    pub approve: bool,
    pub manager_id: i64,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<CustomerView>>")]
pub struct FetchCustomers;

#[derive(Message)]
#[rtype(result = "ServiceResult<AccountClosed>")]
pub struct CloseAccount {
    pub customer_id: i64,
    pub reason: String,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<CustomerView>")]
pub struct SetBlacklist {
    pub customer_id: i64,
    pub blacklisted: bool,
}

// menu

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<MenuEntry>>")]
pub struct FetchMenu;

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<ChefMenuItem>>")]
pub struct FetchChefMenu(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<MenuItem>")]
pub struct CreateMenuItem {
    pub chef_user_id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub image_url: Option<String>,
    pub is_vip_exclusive: bool,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<MenuItem>")]
pub struct UpdateMenuItem {
    pub chef_user_id: i64,
    pub item_id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub image_url: Option<String>,
    pub is_vip_exclusive: Option<bool>,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<()>")]
pub struct DeleteMenuItem {
    pub chef_user_id: i64,
    pub item_id: i64,
}

// orders

#[derive(Message)]
#[rtype(result = "ServiceResult<CheckoutResult>")]
pub struct PlaceOrder {
    pub user_id: i64,
    pub lines: Vec<(i64, i32)>,
    pub delivery_address: Option<String>,
    pub delivery_fee: i64,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<OrderSummary>>")]
pub struct FetchOrderHistory(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<DepositCredited>")]
pub struct CreditDeposit {
    pub user_id: i64,
    pub amount: i64,
    pub payment_intent_id: String,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<()>")]
pub struct RateFood {
    pub user_id: i64,
    pub order_item_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<()>")]
pub struct RateDelivery {
    pub user_id: i64,
    pub order_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<ActiveAndCompleted<KitchenOrder>>")]
pub struct FetchChefOrders(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<Order>")]
pub struct ChefUpdateStatus {
    pub user_id: i64,
    pub order_id: i64,
    pub status: OrderStatus,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<ChefRatings>")]
pub struct FetchChefRatings(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<StaffStats>")]
pub struct FetchStaffStats(pub i64);

// delivery

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<AvailableOrder>>")]
pub struct FetchAvailableOrders(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<DeliveryBid>")]
pub struct PlaceBid {
    pub user_id: i64,
    pub order_id: i64,
    pub bid_amount: i64,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<BidView>>")]
pub struct FetchMyBids(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<ActiveAndCompleted<DeliveryJob>>")]
pub struct FetchMyDeliveries(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<Order>")]
pub struct DeliveryUpdateStatus {
    pub user_id: i64,
    pub order_id: i64,
    pub status: OrderStatus,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<AssignmentCandidate>>")]
pub struct FetchPendingAssignments;

#[derive(Message)]
#[rtype(result = "ServiceResult<AssignmentResult>")]
pub struct AssignDelivery {
    pub manager_id: i64,
    pub order_id: i64,
    pub bid_id: i64,
    pub justification_memo: Option<String>,
}

// feedback

#[derive(Message)]
#[rtype(result = "ServiceResult<FeedbackTargets>")]
pub struct FetchFeedbackTargets;

/// Chefs and couriers are addressed by employee id, customers by username.
#[derive(Debug, Clone)]
pub enum FeedbackTarget {
    Employee(TargetType, i64),
    Customer(String),
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Complaint>")]
pub struct FileComplaint {
    pub author_id: i64,
    pub target: FeedbackTarget,
    pub order_id: Option<i64>,
    pub description: String,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Compliment>")]
pub struct FileCompliment {
    pub author_id: i64,
    pub target: FeedbackTarget,
    pub order_id: Option<i64>,
    pub description: String,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Complaint>")]
pub struct DisputeComplaint {
    pub user_id: i64,
    pub complaint_id: i64,
    pub reason: Option<String>,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<MyFeedback>")]
pub struct FetchMyFeedback(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<ComplaintView>>")]
pub struct FetchComplaints;

#[derive(Message)]
#[rtype(result = "ServiceResult<FeedbackDecision>")]
pub struct ProcessComplaint {
    pub manager_id: i64,
    pub complaint_id: i64,
    pub upheld: bool,
    pub notes: Option<String>,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<ComplimentView>>")]
pub struct FetchCompliments;

#[derive(Message)]
#[rtype(result = "ServiceResult<FeedbackDecision>")]
pub struct ProcessCompliment {
    pub manager_id: i64,
    pub compliment_id: i64,
    pub approve: bool,
}

// hr

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<EmployeeView>>")]
pub struct FetchEmployees;

#[derive(Message)]
#[rtype(result = "ServiceResult<EmployeeView>")]
pub struct HireEmployee {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub employee_type: EmployeeType,
    pub salary: i64,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<EmployeeView>")]
pub struct FireEmployee {
    pub employee_id: i64,
    pub employee_type: Option<EmployeeType>,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<SalaryChange>")]
pub struct AdjustSalary {
    pub employee_id: i64,
    pub action: SalaryAction,
    pub amount: f64,
    pub is_percentage: bool,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<SalaryChange>")]
pub struct AwardBonus {
    pub employee_id: i64,
    pub amount: i64,
    pub reason: Option<String>,
}

// knowledge base

#[derive(Message)]
#[rtype(result = "ServiceResult<KbEntry>")]
pub struct AddKbEntry {
    pub user_id: i64,
    pub question: String,
    pub answer: String,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<KbEntryView>>")]
pub struct FetchMyKbEntries(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<KbEntryView>")]
pub struct RateKbEntry {
    pub user_id: i64,
    pub entry_id: i64,
    pub rating: i32,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<KbEntryView>>")]
pub struct FetchFlaggedKb;

#[derive(Message)]
#[rtype(result = "ServiceResult<KbEntryView>")]
pub struct ModerateKbEntry {
    pub entry_id: i64,
    pub remove: bool,
    pub ban_author: bool,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<KnowledgeSnippet>>")]
pub struct FetchKnowledge;

// discussion

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<TopicSummary>>")]
pub struct FetchTopics;

#[derive(Message)]
#[rtype(result = "ServiceResult<DiscussionTopic>")]
pub struct CreateTopic {
    pub author_id: i64,
    pub title: String,
    pub body: String,
    pub topic_type: TopicType,
    pub related_chef_id: Option<i64>,
    pub related_menu_item_id: Option<i64>,
    pub related_delivery_id: Option<i64>,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<TopicThread>")]
pub struct FetchTopic(pub i64);

#[derive(Message)]
#[rtype(result = "ServiceResult<DiscussionPost>")]
pub struct ReplyToTopic {
    pub topic_id: i64,
    pub author_id: i64,
    pub body: String,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<DiscussionSummary>")]
pub struct FetchDiscussionSummary;
