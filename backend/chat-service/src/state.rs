use crate::{config::Config, events::EventBus, websocket::RoomRegistry};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
    pub registry: RoomRegistry,
    pub redis: redis::Client,
    pub events: EventBus,
    pub config: Arc<Config>,
}
