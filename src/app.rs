use crate::handlers;
use crate::models::{
    CompanyInfo, GalleryItem, JournalEntry, MonthlyReport, PortfolioProject, StudentProfile,
};
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/admin", get(handlers::admin_page))
        .route("/api/health", get(handlers::health))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/me", get(handlers::me))
        .route(
            "/api/profile",
            get(handlers::get_document::<StudentProfile>)
                .put(handlers::put_document::<StudentProfile>),
        )
        .route(
            "/api/company",
            get(handlers::get_document::<CompanyInfo>).put(handlers::put_document::<CompanyInfo>),
        )
        .merge(collection_routes::<JournalEntry>("/api/journal"))
        .merge(collection_routes::<MonthlyReport>("/api/reports"))
        .merge(collection_routes::<PortfolioProject>("/api/portfolio"))
        .route(
            "/api/gallery",
            get(handlers::list_records::<GalleryItem>).post(handlers::create_gallery_item),
        )
        .route(
            "/api/gallery/:id",
            put(handlers::update_gallery_item).delete(handlers::delete_record::<GalleryItem>),
        )
        .route(
            "/api/preferences/music",
            get(handlers::get_music).put(handlers::put_music),
        )
        .route("/api/track/session", post(handlers::start_session))
        .route("/api/track", post(handlers::track_view))
        .route("/api/events", get(handlers::storage_events))
        .route("/api/admin/stats", get(handlers::admin_stats))
        .route("/api/admin/dashboard", get(handlers::admin_snapshot))
        .route("/api/admin/refresh", post(handlers::admin_refresh))
        .route("/api/admin/sessions/:id", get(handlers::admin_session))
        .route("/api/export/journal.txt", get(handlers::export_journal))
        .route("/api/export/reports.pdf", get(handlers::export_reports))
        .route("/api/export/archive.zip", get(handlers::export_archive))
        .with_state(state)
}

fn collection_routes<T: crate::records::Record>(base: &str) -> Router<AppState> {
    Router::new()
        .route(
            base,
            get(handlers::list_records::<T>).post(handlers::create_record::<T>),
        )
        .route(
            &format!("{base}/:id"),
            put(handlers::update_record::<T>).delete(handlers::delete_record::<T>),
        )
}
