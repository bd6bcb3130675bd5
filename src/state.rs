//! Shared application state: the explicit request context threaded through
//! every kernel call. Registries are frozen before serving, so sharing is
//! plain `Arc` with no locking.

use crate::auth::Policy;
use crate::locale::MessageCatalog;
use crate::registry::ResourceRegistry;
use crate::render::ViewRenderer;
use crate::settings::SettingsRegistry;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub settings: Arc<SettingsRegistry>,
    pub registry: Arc<ResourceRegistry>,
    pub policy: Arc<dyn Policy>,
    pub renderer: Arc<dyn ViewRenderer>,
    pub catalog: Arc<MessageCatalog>,
}
