use crate::models::{AdvancedStats, PageCount, UserType, VisitorSession};
use crate::remote::SessionTable;
use crate::tracking::now_millis;
use chrono::{Local, TimeZone};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::warn;

/// Sessions active within this window count as live.
pub const LIVE_WINDOW_MS: i64 = 5 * 60 * 1000;
const TOP_PAGE_COUNT: usize = 5;

fn mobile_agent() -> &'static Regex {
    static MOBILE: OnceLock<Regex> = OnceLock::new();
    MOBILE.get_or_init(|| {
        Regex::new(r"(?i)Mobi|Android|iPhone|iPad|iPod|Windows Phone").expect("valid regex")
    })
}

pub fn is_mobile(user_agent: &str) -> bool {
    mobile_agent().is_match(user_agent)
}

/// Fetches every session row and reduces it. `None` when the table is
/// unreachable.
pub async fn get_advanced_stats(table: &SessionTable, wrap_limit: u64) -> Option<AdvancedStats> {
    match table.fetch_all().await {
        Ok(sessions) => Some(build_stats(&sessions, wrap_limit)),
        Err(err) => {
            warn!("failed to fetch sessions for stats: {err}");
            None
        }
    }
}

pub fn build_stats(sessions: &[VisitorSession], wrap_limit: u64) -> AdvancedStats {
    build_stats_at(now_millis(), local_midnight_millis(), sessions, wrap_limit)
}

/// `now` and `day_start` are epoch milliseconds.
pub fn build_stats_at(
    now: i64,
    day_start: i64,
    sessions: &[VisitorSession],
    wrap_limit: u64,
) -> AdvancedStats {
    let wrap_limit = wrap_limit.max(1);
    let total_sessions = sessions.len() as u64;
    let mut total_page_views = 0u64;
    let mut live_visitors = 0u64;
    let mut mobile = 0u64;
    let mut admin_sessions = 0u64;
    let mut today_sessions = 0u64;
    let mut views_by_path: HashMap<&str, u64> = HashMap::new();

    for session in sessions {
        total_page_views += session.pages.len() as u64;
        if now - session.last_activity <= LIVE_WINDOW_MS {
            live_visitors += 1;
        }
        if is_mobile(&session.device.user_agent) {
            mobile += 1;
        }
        if session.user_type == UserType::Admin {
            admin_sessions += 1;
        }
        if session.start_time >= day_start {
            today_sessions += 1;
        }
        for page in &session.pages {
            *views_by_path.entry(page.path.as_str()).or_default() += 1;
        }
    }

    let mut top_pages: Vec<PageCount> = views_by_path
        .into_iter()
        .map(|(path, views)| PageCount {
            path: path.to_string(),
            views,
        })
        .collect();
    top_pages.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.path.cmp(&b.path)));
    top_pages.truncate(TOP_PAGE_COUNT);

    AdvancedStats {
        total_sessions,
        total_page_views,
        display_sessions: total_sessions % wrap_limit,
        display_page_views: total_page_views % wrap_limit,
        live_visitors,
        mobile_percentage: percentage(mobile, total_sessions),
        avg_page_depth: ratio(total_page_views, total_sessions),
        admin_sessions,
        visitor_sessions: total_sessions - admin_sessions,
        today_sessions,
        top_pages,
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    round1(share(part, whole) * 100.0)
}

fn ratio(part: u64, whole: u64) -> f64 {
    round1(share(part, whole))
}

fn share(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn local_midnight_millis() -> i64 {
    let today = Local::now().date_naive();
    today
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
        .map(|midnight| midnight.timestamp_millis())
        .unwrap_or(0)
}
