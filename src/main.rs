use std::io;

use actix::SyncArbiter;
use actix_cors::Cors;
use actix_web::web::{self, Data};
use actix_web::{http, middleware, App, HttpServer};
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::services::db_utils::{get_db_pool, AppState, PgActor};
use crate::services::stripe::StripeClient;

mod chatbot;
mod config;
mod error;
mod rules;
mod schema;
mod services;
mod types;

#[cfg(test)]
mod test;

fn init_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn startup_error(what: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{what}: {err}");
    io::Error::new(io::ErrorKind::Other, format!("{what}: {err}"))
}

pub fn api_scope() -> actix_web::Scope {
    web::scope("/api")
        .service(services::account_route::login)
        .service(services::account_route::logout)
        .service(services::account_route::profile)
        .service(services::account_route::request_registration)
        .service(services::account_route::register)
        .service(services::menu_route::browse)
        .service(services::order_route::place_order)
        .service(services::order_route::order_history)
        .service(services::order_route::review_food)
        .service(services::order_route::review_driver)
        .service(services::chef_route::add_item)
        .service(services::delivery_route::place_bid)
        .service(services::manager_route::assign_delivery)
        .service(services::manager_route::close_account)
        .service(services::manager_route::blacklist)
        .service(services::manager_route::process_registration)
        .service(services::feedback_route::feedback_targets)
        .service(services::feedback_route::file_complaint)
        .service(services::feedback_route::file_compliment)
        .service(services::feedback_route::dispute_complaint)
        .service(services::feedback_route::my_complaints)
        .service(services::feedback_route::process_complaint)
        .service(services::feedback_route::process_compliment)
        .service(services::chat_route::chat)
        .service(services::discussion_route::topics)
        .service(services::discussion_route::create_topic)
        .service(services::discussion_route::topic)
        .service(services::discussion_route::reply)
        .service(
            web::scope("/deposit")
                .service(services::deposit_route::create_deposit)
                .service(services::deposit_route::confirm_deposit),
        )
        .service(
            web::scope("/chef")
                .service(services::chef_route::chef_menu)
                .service(services::chef_route::add_menu_item)
                .service(services::chef_route::update_menu_item)
                .service(services::chef_route::delete_menu_item)
                .service(services::chef_route::chef_orders)
                .service(services::chef_route::chef_update_status)
                .service(services::chef_route::chef_ratings)
                .service(services::chef_route::chef_stats),
        )
        .service(
            web::scope("/delivery")
                .service(services::delivery_route::available_orders)
                .service(services::delivery_route::my_bids)
                .service(services::delivery_route::my_deliveries)
                .service(services::delivery_route::update_status)
                .service(services::delivery_route::delivery_stats),
        )
        .service(
            web::scope("/manager")
                .service(services::manager_route::pending_deliveries)
                .service(services::manager_route::customers)
                .service(services::manager_route::registrations)
                .service(services::feedback_route::open_complaints)
                .service(services::feedback_route::pending_compliments)
                .service(services::hr_route::employees)
                .service(services::kb_route::flagged_entries)
                .service(services::discussion_route::discussion_summary),
        )
        .service(
            web::scope("/hr")
                .service(services::hr_route::hire)
                .service(services::hr_route::fire)
                .service(services::hr_route::salary)
                .service(services::hr_route::bonus),
        )
        .service(
            web::scope("/kb")
                .service(services::kb_route::add_entry)
                .service(services::kb_route::my_entries)
                .service(services::kb_route::rate_entry)
                .service(services::kb_route::manage_entry),
        )
        .service(web::scope("/test").service(services::test_route::healthcheck))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    let settings = Settings::load().map_err(|err| startup_error("Invalid configuration", err))?;
    init_tracing(settings.server.json_logs);
    info!(
        host = %settings.server.host,
        port = settings.server.port,
        pool_size = settings.database.pool_size,
        "Configuration loaded"
    );

    let pool = get_db_pool(&settings.database.url, settings.database.pool_size)
        .map_err(|err| startup_error("Unable to connect to Postgres", err))?;
    let pg_db = SyncArbiter::start(settings.database.pool_size as usize, move || PgActor(pool.clone()));

    let redis_db =
        redis::Client::open(settings.redis.url.as_str()).map_err(|err| startup_error("Invalid Redis URI", err))?;

    let state = Data::new(AppState {
        pg_db,
        redis_db,
        stripe: StripeClient::new(settings.stripe.clone()),
        settings: settings.clone(),
    });

    let (host, port) = settings.bind_address();
    info!(%host, port, "Starting server");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&settings.server.cors_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec![http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(services::home_page)
            .service(api_scope())
    })
    .bind((host, port))?
    .run()
    .await
}
