use crate::adapters::{ExpoPushSender, TokioTimeProvider};
use crate::config::AppConfig;
use crate::notify;
use crate::store::SqliteStore;

pub(crate) type AppEngine = notify::Engine<SqliteStore, ExpoPushSender, TokioTimeProvider>;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: SqliteStore,
    pub(crate) engine: AppEngine,
}
