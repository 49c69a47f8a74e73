use crate::auth::AdminSessions;
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::geo::GeoClient;
use crate::remote::SessionTable;
use crate::storage::{LocalStore, StorageEvent};
use crate::tracking::Tracker;
use axum::http::HeaderMap;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<Mutex<LocalStore>>,
    pub events: broadcast::Sender<StorageEvent>,
    pub tracker: Arc<Tracker>,
    pub dashboard: Arc<Dashboard>,
    pub geo: GeoClient,
    pub admins: Arc<AdminSessions>,
}

impl AppState {
    pub fn new(config: Config, store: LocalStore) -> Self {
        let client = Client::new();
        let table = SessionTable::from_config(client.clone(), &config);
        Self {
            events: store.events(),
            store: Arc::new(Mutex::new(store)),
            tracker: Arc::new(Tracker::new(table)),
            dashboard: Arc::new(Dashboard::default()),
            geo: GeoClient::new(client, &config.geo_url),
            admins: Arc::new(AdminSessions::default()),
            config: Arc::new(config),
        }
    }

    pub fn sessions(&self) -> &SessionTable {
        self.tracker.table()
    }

    pub async fn is_admin(&self, headers: &HeaderMap) -> bool {
        self.admins.check(headers).await
    }
}
