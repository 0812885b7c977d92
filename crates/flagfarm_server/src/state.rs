use crate::config::Config;
use flagfarm_db::{FlagStore, HfiRegistry};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub flags: FlagStore,
    pub hfi: HfiRegistry,
}
