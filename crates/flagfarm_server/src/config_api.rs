//! `GET /api/config` (§6): the subset of server config clients need.

use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use flagfarm_protocol::RemoteConfig;

pub async fn get_config_handler(State(state): State<AppState>) -> Json<RemoteConfig> {
    Json(RemoteConfig {
        flag_format: state.config.flag_format.clone(),
        flag_lifetime: state.config.flag_lifetime_ticks,
        tick_duration: state.config.tick_duration_secs,
        teams: state.config.teams.clone(),
    })
}
