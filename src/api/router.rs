use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::{require_admin_token, require_cron_secret};
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Public routes: reads, wallet transaction builders, frames, webhook
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render))
        // Markets
        .route("/api/markets", get(handlers::markets::list))
        .route("/api/markets/:id", get(handlers::markets::detail))
        .route("/api/markets/:id/bets/:address", get(handlers::markets::user_bet))
        .route("/api/markets/:id/sync", post(handlers::markets::sync))
        // Wallet transactions
        .route("/api/tx/bet", post(handlers::tx::bet))
        .route("/api/tx/create", post(handlers::tx::create))
        .route("/api/tx/claim", post(handlers::tx::claim))
        // Frames
        .route(
            "/frames/market/:id",
            get(handlers::frames::card).post(handlers::frames::refresh),
        )
        .route("/frames/market/:id/tx/:action", post(handlers::frames::transaction))
        .route("/frames/market/:id/done", post(handlers::frames::done))
        // Bot mentions
        .route("/api/webhook", post(handlers::webhook::receive));

    // Scheduler-triggered jobs: CRON_SECRET as bearer or ?secret=
    let cron = Router::new()
        .route("/api/cron/index", get(handlers::cron::index))
        .route("/api/cron/resolve", get(handlers::cron::resolve))
        .route("/api/cron/sync", get(handlers::cron::sync))
        .layer(middleware::from_fn_with_state(state.clone(), require_cron_secret));

    // Admin: ADMIN_TOKEN bearer
    let admin = Router::new()
        .route("/api/admin/markets/:id/cancel", post(handlers::admin::cancel))
        .route("/api/admin/markets/:id", delete(handlers::admin::remove))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin_token));

    // Frames are fetched cross-origin by clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(cron)
        .merge(admin)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
