use actix_web::{get, HttpResponse, Responder};

pub mod auth;
pub mod db_models;
pub mod db_utils;
pub mod insertable;
pub mod messages;
pub mod pg_handling;
pub mod redis_handling;
pub mod stripe;
pub mod views;

#[get("/")]
pub async fn home_page() -> impl Responder {
    HttpResponse::Ok().body("Mashallah Eats API")
}

// sub-route "/api": login, registration, profile
pub mod account_route;

// sub-route "/api": menu browsing
pub mod menu_route;

// sub-route "/api": checkout, history, ratings
pub mod order_route;

// sub-route "/api/deposit"
pub mod deposit_route;

// sub-route "/api/chef"
pub mod chef_route;

// sub-route "/api/delivery"
pub mod delivery_route;

// sub-route "/api/manager"
pub mod manager_route;

// sub-route "/api": complaints and compliments
pub mod feedback_route;

// sub-route "/api/hr"
pub mod hr_route;

// sub-route "/api/kb"
pub mod kb_route;

// sub-route "/api/chat"
pub mod chat_route;

// sub-route "/api": discussion board
pub mod discussion_route;

// sub-route "/api/test"
pub mod test_route;
