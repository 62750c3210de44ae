mod config;
mod controllers;
mod errors;
mod middleware;
mod models;
mod services;
mod types;
mod utils;

use std::fmt::Display;
use std::io;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use cache_client::CacheManager;
use dotenvy::dotenv;
use log::{info, warn};
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;
use crate::controllers::admin_event_controller::{
    cancel_event, create_event, resolve_event, update_event_status,
};
use crate::controllers::admin_ledger_controller::{
    list_failed_transactions, resolve_failed_transaction,
};
use crate::controllers::auth_controller::{get_me, login, register, update_profile, wallet_login};
use crate::controllers::event_controller::{get_all_events, get_event_by_id};
use crate::controllers::ticket_controller::{
    claim_all_tickets, claim_ticket, get_my_tickets, purchase_tickets,
};
use crate::errors::ApiError;
use crate::middleware::admin::AdminMiddleware;
use crate::middleware::auth::AuthMiddleware;
use crate::services::auto_lock::start_auto_lock_sweeper;
use crate::services::payment_verifier::PaymentVerifier;

async fn health() -> impl Responder {
    HttpResponse::Ok()
        .content_type("application/json")
        .body(r#"{"status": "Ok"}"#)
}

fn startup_error(context: &str, e: impl Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

async fn init_cache(redis_url: &str) {
    let manager = match CacheManager::init_global(redis_url) {
        Ok(manager) => manager,
        Err(e) => {
            warn!("Redis cache disabled, failed to initialise: {}", e);
            return;
        }
    };
    match manager.connect().await {
        Ok(()) => info!("Connected to Redis"),
        Err(e) => warn!("Redis connection failed, reads go to Postgres: {}", e),
    }
}

async fn run() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| startup_error("Failed to connect to Postgres", e))?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| startup_error("Failed to run migrations", e))?;
    info!("Connected to Postgres, migrations applied");

    match &config.redis_url {
        Some(url) => init_cache(url).await,
        None => info!("REDIS_URL not set, event cache disabled"),
    }

    let verifier = PaymentVerifier::new(&config)
        .map_err(|e| startup_error("Failed to build RPC client", e))?;

    start_auto_lock_sweeper(db_pool.clone(), config.auto_lock_interval);

    let bind_addr = config.bind_addr.clone();
    let db_pool = web::Data::new(db_pool);
    let config = web::Data::new(config);
    let verifier = web::Data::new(verifier);

    info!("Listening on {}", bind_addr);

    HttpServer::new(move || {
        let json_config = web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into());
        let query_config = web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into());

        let auth_scope = web::scope("/auth")
            .service(register)
            .service(login)
            .service(wallet_login);

        let account_scope = web::scope("/account")
            .wrap(AuthMiddleware)
            .service(get_me)
            .service(update_profile);

        let event_scope = web::scope("/events")
            .service(get_all_events)
            .service(get_event_by_id);

        let ticket_scope = web::scope("/tickets")
            .wrap(AuthMiddleware)
            .service(purchase_tickets)
            .service(get_my_tickets)
            .service(claim_ticket)
            .service(claim_all_tickets);

        // Registered last runs first: authenticate, then check admin rights.
        let admin_scope = web::scope("/admin")
            .wrap(AdminMiddleware)
            .wrap(AuthMiddleware)
            .service(create_event)
            .service(update_event_status)
            .service(resolve_event)
            .service(cancel_event)
            .service(list_failed_transactions)
            .service(resolve_failed_transaction);

        App::new()
            .app_data(json_config)
            .app_data(query_config)
            .app_data(db_pool.clone())
            .app_data(config.clone())
            .app_data(verifier.clone())
            .route("/health", web::get().to(health))
            .service(auth_scope)
            .service(account_scope)
            .service(event_scope)
            .service(ticket_scope)
            .service(admin_scope)
    })
    .bind(bind_addr)?
    .run()
    .await
}

fn main() -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run())
}
