use std::sync::Arc;

use crate::{backend::BackendClient, config::AppConfig, notify::Notifier};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: BackendClient,
    pub notifier: Notifier,
}
