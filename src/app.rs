use crate::adapters::{ExpoPushSender, TokioTimeProvider};
use crate::config;
use crate::notify;
use crate::state;
use crate::store::SqliteStore;

use axum::Router;
use axum::routing::get;
use axum::routing::post;
use serde::Serialize;

mod notifications;
mod prices;
mod subscriptions;

pub fn app(config: config::AppConfig) -> Router {
    router(build_state(config))
}

pub(crate) fn build_state(config: config::AppConfig) -> state::AppState {
    let store = SqliteStore::open(&config.db_path)
        .unwrap_or_else(|err| panic!("failed to open notification store: {err}"));
    let sender = ExpoPushSender::new(config.expo_url.clone(), config.push_timeout)
        .unwrap_or_else(|err| panic!("failed to init push client: {err}"));
    let settings = notify::NotifySettings {
        cooldown: config.cooldown,
        batch_delay: config.batch_delay,
    };
    let engine = notify::Engine::new(store.clone(), sender, TokioTimeProvider, settings);
    state::AppState {
        config,
        store,
        engine,
    }
}

pub(crate) fn router(state: state::AppState) -> Router {
    Router::new()
        .route("/api/subscriptions", post(subscriptions::register))
        .route("/api/prices", post(prices::price_submitted))
        .route("/api/notifications/flush", post(notifications::flush))
        .route("/api/debug/batches", get(notifications::batches_debug))
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

#[derive(Serialize)]
pub(crate) struct StatusResponse {
    pub(crate) status: &'static str,
}

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: &'static str,
}
