use crate::models::{DeviceInfo, PageView, SessionActivity, UserType, VisitorSession};
use crate::remote::SessionTable;
use crate::errors::RemoteError;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Who is browsing, captured from the request that reported the view.
#[derive(Debug, Clone, Default)]
pub struct VisitorContext {
    pub user_type: UserType,
    pub device: DeviceInfo,
}

/// Tabs quiet for this long are forgotten; their next view starts a new
/// session.
pub const TAB_IDLE_MS: i64 = 30 * 60 * 1000;

type TokenSlot = Arc<Mutex<Option<String>>>;

struct TabEntry {
    token: TokenSlot,
    last_seen: i64,
}

/// Records visitor sessions in the hosted table.
///
/// Each browser tab owns at most one session token. Tokens live only in
/// memory, so a restart starts every tab over with a fresh session. Work
/// for one tab runs under that tab's slot lock, one call at a time.
pub struct Tracker {
    table: SessionTable,
    tabs: Mutex<HashMap<String, TabEntry>>,
    idle_ms: i64,
}

impl Tracker {
    pub fn new(table: SessionTable) -> Self {
        Self::with_idle_limit(table, TAB_IDLE_MS)
    }

    pub fn with_idle_limit(table: SessionTable, idle_ms: i64) -> Self {
        Self {
            table,
            tabs: Mutex::new(HashMap::new()),
            idle_ms,
        }
    }

    pub fn table(&self) -> &SessionTable {
        &self.table
    }

    pub async fn session_token(&self, tab: &str) -> Option<String> {
        let slot = self.tabs.lock().await.get(tab).map(|entry| entry.token.clone())?;
        let token = slot.lock().await;
        token.clone()
    }

    pub async fn tracked_tabs(&self) -> usize {
        self.tabs.lock().await.len()
    }

    /// Creates the tab's session if it has none yet. The landing path is
    /// the session's first page entry.
    ///
    /// Remote failures are logged and leave the tab without a token.
    pub async fn initialize_tracking(
        &self,
        tab: &str,
        landing: &str,
        visitor: &VisitorContext,
    ) -> Option<String> {
        let slot = self.slot(tab).await;
        let mut token = slot.lock().await;
        if let Some(existing) = token.as_ref() {
            return Some(existing.clone());
        }
        self.start_session(&mut token, landing, visitor).await
    }

    /// Appends one page entry to the tab's session.
    pub async fn track_page_view(&self, tab: &str, path: &str, visitor: &VisitorContext) {
        let slot = self.slot(tab).await;
        let mut token = slot.lock().await;
        let Some(current) = token.clone() else {
            self.start_session(&mut token, path, visitor).await;
            return;
        };

        match self.append_page(&current, path).await {
            Ok(()) => debug!(session = %current, path, "page view recorded"),
            Err(RemoteError::NotFound(_)) => {
                warn!(session = %current, "session vanished remotely, starting a new one");
                *token = None;
                self.start_session(&mut token, path, visitor).await;
            }
            Err(err) => warn!(session = %current, "failed to record page view: {err}"),
        }
    }

    /// Returns the tab's token slot, creating it if needed, and drops tabs
    /// that have been idle too long.
    async fn slot(&self, tab: &str) -> TokenSlot {
        let now = now_millis();
        let mut tabs = self.tabs.lock().await;

        let before = tabs.len();
        // A slot still referenced elsewhere has a call in flight.
        tabs.retain(|_, entry| {
            now - entry.last_seen <= self.idle_ms || Arc::strong_count(&entry.token) > 1
        });
        if tabs.len() < before {
            debug!(dropped = before - tabs.len(), "forgot idle tabs");
        }

        let entry = tabs.entry(tab.to_string()).or_insert_with(|| TabEntry {
            token: TokenSlot::default(),
            last_seen: now,
        });
        entry.last_seen = now;
        entry.token.clone()
    }

    async fn start_session(
        &self,
        token: &mut Option<String>,
        landing: &str,
        visitor: &VisitorContext,
    ) -> Option<String> {
        let now = now_millis();
        let session = VisitorSession {
            id: new_token(),
            user_type: visitor.user_type,
            start_time: now,
            last_activity: now,
            pages: vec![PageView {
                path: landing.to_string(),
                timestamp: now,
            }],
            device: visitor.device.clone(),
        };

        match self.table.upsert(&session).await {
            Ok(()) => {
                info!(session = %session.id, "visitor session started");
                *token = Some(session.id.clone());
                Some(session.id)
            }
            Err(err) => {
                warn!("failed to create visitor session: {err}");
                None
            }
        }
    }

    async fn append_page(&self, token: &str, path: &str) -> Result<(), RemoteError> {
        let mut session = self.table.fetch(token).await?;
        let now = now_millis();
        session.pages.push(PageView {
            path: path.to_string(),
            timestamp: now,
        });
        let activity = SessionActivity {
            pages: &session.pages,
            last_activity: now,
        };
        self.table.update_activity(token, &activity).await
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn new_token() -> String {
    format!("session_{}", Uuid::new_v4().simple())
}
