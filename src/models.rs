use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Admin,
    #[default]
    Visitor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageView {
    pub path: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// One row of the hosted session table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorSession {
    pub id: String,
    pub user_type: UserType,
    pub start_time: i64,
    pub last_activity: i64,
    #[serde(default)]
    pub pages: Vec<PageView>,
    #[serde(default)]
    pub device: DeviceInfo,
}

impl VisitorSession {
    pub fn duration_ms(&self) -> i64 {
        (self.last_activity - self.start_time).max(0)
    }
}

/// Body of the PATCH sent after each page view.
#[derive(Debug, Serialize)]
pub struct SessionActivity<'a> {
    pub pages: &'a [PageView],
    pub last_activity: i64,
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub tab_id: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentProfile {
    pub name: String,
    pub student_id: String,
    pub school: String,
    pub major: String,
    pub email: String,
    pub phone: String,
    pub photo: String,
    pub bio: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyInfo {
    pub name: String,
    pub address: String,
    pub industry: String,
    pub supervisor: String,
    pub supervisor_phone: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct JournalEntry {
    pub id: i64,
    pub date: String,
    pub activity: String,
    pub description: String,
    pub learnings: String,
    pub obstacles: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MonthlyReport {
    pub id: i64,
    pub month: String,
    pub title: String,
    pub content: String,
    pub achievements: String,
    pub challenges: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PortfolioProject {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub link: String,
    pub image: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GalleryItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: String,
    /// `data:image/...;base64,...`
    pub image: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthStatus {
    pub is_admin: bool,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MusicPreference {
    pub playing: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageCount {
    pub path: String,
    pub views: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AdvancedStats {
    pub total_sessions: u64,
    pub total_page_views: u64,
    pub display_sessions: u64,
    pub display_page_views: u64,
    pub live_visitors: u64,
    pub mobile_percentage: f64,
    pub avg_page_depth: f64,
    pub admin_sessions: u64,
    pub visitor_sessions: u64,
    pub today_sessions: u64,
    pub top_pages: Vec<PageCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoInfo {
    pub ip: String,
    pub country: Option<String>,
    pub city: Option<String>,
    pub org: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskScore {
    pub score: u8,
    pub level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    pub session: VisitorSession,
    pub duration_ms: i64,
    pub risk: RiskScore,
    pub geo: Option<GeoInfo>,
    pub map_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DashboardSnapshot {
    pub stats: Option<AdvancedStats>,
    pub sessions: Vec<VisitorSession>,
    pub refreshed_at: Option<i64>,
}
