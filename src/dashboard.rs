use crate::analytics::build_stats;
use crate::errors::{AppError, RemoteError};
use crate::geo::{map_embed_url, GeoClient};
use crate::models::{DashboardSnapshot, RiskLevel, RiskScore, SessionDetail, VisitorSession};
use crate::remote::SessionTable;
use crate::tracking::now_millis;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const PAGE_WEIGHT: u32 = 5;
const PAGE_CAP: u32 = 10;
const VERY_SHORT_MS: i64 = 10_000;
const SHORT_MS: i64 = 60_000;

/// Heuristic score for the session detail panel: many pages in a very
/// short visit looks automated. Not used to block anyone.
pub fn risk_score(session: &VisitorSession) -> RiskScore {
    let pages = (session.pages.len() as u32).min(PAGE_CAP) * PAGE_WEIGHT;
    let duration = session.duration_ms();
    let brevity = if duration < VERY_SHORT_MS {
        40
    } else if duration < SHORT_MS {
        20
    } else {
        0
    };

    let score = (pages + brevity).min(100) as u8;
    let level = match score {
        0..=29 => RiskLevel::Low,
        30..=59 => RiskLevel::Medium,
        _ => RiskLevel::High,
    };
    RiskScore { score, level }
}

/// Latest stats and session list, refreshed by a background poller.
#[derive(Default)]
pub struct Dashboard {
    snapshot: RwLock<DashboardSnapshot>,
}

impl Dashboard {
    pub async fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot.read().await.clone()
    }

    /// One poll. A failed fetch keeps the previous snapshot.
    pub async fn refresh(&self, table: &SessionTable, wrap_limit: u64) {
        match table.fetch_all().await {
            Ok(sessions) => {
                let stats = build_stats(&sessions, wrap_limit);
                let mut snapshot = self.snapshot.write().await;
                snapshot.stats = Some(stats);
                snapshot.sessions = sessions;
                snapshot.refreshed_at = Some(now_millis());
                debug!(sessions = snapshot.sessions.len(), "dashboard refreshed");
            }
            Err(err) => warn!("dashboard refresh failed: {err}"),
        }
    }

    pub fn spawn_poller(
        self: Arc<Self>,
        table: SessionTable,
        wrap_limit: u64,
        every: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                self.refresh(&table, wrap_limit).await;
            }
        })
    }

    pub async fn session_detail(
        &self,
        table: &SessionTable,
        geo: &GeoClient,
        id: &str,
    ) -> Result<SessionDetail, AppError> {
        let cached = self
            .snapshot
            .read()
            .await
            .sessions
            .iter()
            .find(|session| session.id == id)
            .cloned();

        let session = match cached {
            Some(session) => session,
            None => table.fetch(id).await.map_err(|err| match err {
                RemoteError::NotFound(_) => AppError::not_found(format!("session {id} not found")),
                other => {
                    warn!("failed to fetch session {id}: {other}");
                    AppError::bad_gateway(format!("session {id} unavailable"))
                }
            })?,
        };

        let geo = geo.try_lookup(session.device.ip.as_deref()).await;
        let map_url = geo.as_ref().and_then(map_embed_url);
        Ok(SessionDetail {
            duration_ms: session.duration_ms(),
            risk: risk_score(&session),
            session,
            geo,
            map_url,
        })
    }
}
