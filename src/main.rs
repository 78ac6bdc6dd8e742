//! Event Slotting Backend
//!
//! REST backend for community events: users sign up for roles within the
//! sides and groups of a scheduled event, and slot changes are mirrored to
//! community platform roles.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod notify;
mod projection;
mod slotting;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use notify::{DiscordNotifier, NoopNotifier, RoleNotifier};
use slotting::SlotService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub slots: Arc<SlotService>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Event Slotting Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No gateway PSK configured (SLOTTING_API_PSK). Gateway authentication is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let notifier: Arc<dyn RoleNotifier> = match &config.discord {
        Some(discord) => {
            tracing::info!("Role notifications go to Discord guild {}", discord.guild_id);
            Arc::new(DiscordNotifier::new(discord, config.notify_timeout)?)
        }
        None => {
            tracing::info!("No Discord credentials configured, role notifications disabled");
            Arc::new(NoopNotifier)
        }
    };

    let slots = Arc::new(SlotService::new(
        repo,
        notifier,
        config.max_slot_attempts,
        config.notify_timeout,
    ));

    let state = AppState {
        slots,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    // Mutations go through the gateway and carry a requester identity
    let protected_routes = Router::new()
        .route("/events", post(api::create_event))
        .route("/events/slot", post(api::slot))
        .route("/events/unslot", post(api::unslot))
        .route("/events/admin/kick", post(api::kick))
        .route("/events/{event_id}", put(api::update_event))
        .route("/events/{event_id}", delete(api::delete_event))
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    let public_routes = Router::new()
        .route("/events", get(api::list_events))
        .route("/events/{event_id}", get(api::get_event))
        .route("/health", get(api::health_check))
        .route("/health/notifications", get(api::notifier_health));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
