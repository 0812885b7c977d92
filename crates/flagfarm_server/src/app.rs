use crate::state::AppState;
use crate::{artifacts, config_api, flags_api, ingest, session};
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/flags/:exploit", post(ingest::ingest_handler))
        .route("/flags", get(flags_api::list_flags_handler))
        .route("/config", get(config_api::get_config_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), session::require_session));

    let api = Router::new()
        .route("/auth", post(session::auth_handler))
        .merge(authenticated);

    Router::new()
        .nest("/api", api)
        .route("/hfi/:os/:arch", get(artifacts::serve_artifact))
        .route("/hfi/:os/:arch/timestamp", get(artifacts::serve_timestamp))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
