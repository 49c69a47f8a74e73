use crate::analytics::get_advanced_stats;
use crate::auth::{cookie_token, expired_cookie, session_cookie};
use crate::errors::AppError;
use crate::export::{archive_zip, journal_text, reports_pdf};
use crate::images::check_upload;
use crate::models::{
    AdvancedStats, AuthStatus, CompanyInfo, DashboardSnapshot, DeleteParams, DeviceInfo,
    GalleryItem, JournalEntry, LoginRequest, MonthlyReport, MusicPreference, SessionDetail,
    StudentProfile, TrackRequest, UserType,
};
use crate::records::{self, Document, Record};
use crate::state::AppState;
use crate::storage::keys;
use crate::tracking::{now_millis, VisitorContext};
use crate::ui::{render_dashboard, render_index};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse,
    },
    Json,
};
use serde_json::{json, Value};
use std::convert::Infallible;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::info;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let store = state.store.lock().await;
    let profile: StudentProfile = records::load_document(&store);
    let company: CompanyInfo = records::load_document(&store);
    Html(render_index(&profile, &company))
}

pub async fn admin_page(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, AppError> {
    require_admin(&state, &headers).await?;
    Ok(Html(render_dashboard(state.config.poll_interval.as_secs())))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(AppError::missing_field("email"));
    }
    if email != state.config.admin_email || payload.password != state.config.admin_password {
        return Err(AppError::unauthorized("wrong email or password"));
    }

    let token = state.admins.issue().await;
    let mut store = state.store.lock().await;
    store.set_item(keys::IS_ADMIN, "true").await?;
    store.set_item(keys::USER_EMAIL, email).await?;
    info!("admin signed in");
    Ok((
        [(header::SET_COOKIE, session_cookie(&token))],
        Json(AuthStatus {
            is_admin: true,
            email: Some(email.to_string()),
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = cookie_token(&headers) {
        // The stored flag stays while another browser is still signed in.
        if !state.admins.revoke(token).await {
            let mut store = state.store.lock().await;
            store.remove_item(keys::IS_ADMIN).await?;
            store.remove_item(keys::USER_EMAIL).await?;
        }
        info!("admin signed out");
    }
    Ok((
        [(header::SET_COOKIE, expired_cookie())],
        Json(AuthStatus {
            is_admin: false,
            email: None,
        }),
    ))
}

pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Json<AuthStatus> {
    if !state.is_admin(&headers).await {
        return Json(AuthStatus {
            is_admin: false,
            email: None,
        });
    }
    let store = state.store.lock().await;
    Json(AuthStatus {
        is_admin: true,
        email: store.get_item(keys::USER_EMAIL).map(str::to_string),
    })
}

pub async fn get_document<T: Document>(State(state): State<AppState>) -> Json<T> {
    let store = state.store.lock().await;
    Json(records::load_document(&store))
}

pub async fn put_document<T: Document>(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(document): Json<T>,
) -> Result<Json<T>, AppError> {
    require_admin(&state, &headers).await?;
    let mut store = state.store.lock().await;
    Ok(Json(records::save_document(&mut store, document).await?))
}

pub async fn list_records<T: Record>(State(state): State<AppState>) -> Json<Vec<T>> {
    let store = state.store.lock().await;
    Json(records::list(&store))
}

pub async fn create_record<T: Record>(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(record): Json<T>,
) -> Result<(StatusCode, Json<T>), AppError> {
    require_admin(&state, &headers).await?;
    let mut store = state.store.lock().await;
    let saved = records::add(&mut store, record, now_millis()).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn update_record<T: Record>(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(record): Json<T>,
) -> Result<Json<T>, AppError> {
    require_admin(&state, &headers).await?;
    let mut store = state.store.lock().await;
    Ok(Json(records::update(&mut store, id, record).await?))
}

pub async fn delete_record<T: Record>(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, AppError> {
    require_admin(&state, &headers).await?;
    let mut store = state.store.lock().await;
    records::delete::<T>(&mut store, id, params.confirm).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_gallery_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(item): Json<GalleryItem>,
) -> Result<(StatusCode, Json<GalleryItem>), AppError> {
    require_admin(&state, &headers).await?;
    check_gallery_image(&state, &item)?;
    let mut store = state.store.lock().await;
    let saved = records::add(&mut store, item, now_millis()).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn update_gallery_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(item): Json<GalleryItem>,
) -> Result<Json<GalleryItem>, AppError> {
    require_admin(&state, &headers).await?;
    check_gallery_image(&state, &item)?;
    let mut store = state.store.lock().await;
    Ok(Json(records::update(&mut store, id, item).await?))
}

fn check_gallery_image(state: &AppState, item: &GalleryItem) -> Result<(), AppError> {
    if item.image.trim().is_empty() {
        return Err(AppError::missing_field("image"));
    }
    check_upload(&item.image, state.config.max_image_bytes).map(|_| ())
}

pub async fn get_music(State(state): State<AppState>) -> Json<MusicPreference> {
    let store = state.store.lock().await;
    Json(MusicPreference {
        playing: store.flag(keys::MUSIC_PLAYING),
    })
}

pub async fn put_music(
    State(state): State<AppState>,
    Json(preference): Json<MusicPreference>,
) -> Result<Json<MusicPreference>, AppError> {
    let mut store = state.store.lock().await;
    store
        .set_item(keys::MUSIC_PLAYING, preference.playing.to_string())
        .await?;
    Ok(Json(preference))
}

pub async fn start_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TrackRequest>,
) -> Result<StatusCode, AppError> {
    let (tab, path) = track_target(&payload)?;
    let visitor = visitor_context(&state, &headers).await;
    let tracker = state.tracker.clone();
    tokio::spawn(async move {
        tracker.initialize_tracking(&tab, &path, &visitor).await;
    });
    Ok(StatusCode::ACCEPTED)
}

pub async fn track_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TrackRequest>,
) -> Result<StatusCode, AppError> {
    let (tab, path) = track_target(&payload)?;
    let visitor = visitor_context(&state, &headers).await;
    let tracker = state.tracker.clone();
    tokio::spawn(async move {
        tracker.track_page_view(&tab, &path, &visitor).await;
    });
    Ok(StatusCode::ACCEPTED)
}

fn track_target(payload: &TrackRequest) -> Result<(String, String), AppError> {
    let tab = payload.tab_id.trim();
    let path = payload.path.trim();
    if tab.is_empty() {
        return Err(AppError::missing_field("tab_id"));
    }
    if path.is_empty() {
        return Err(AppError::missing_field("path"));
    }
    Ok((tab.to_string(), path.to_string()))
}

async fn visitor_context(state: &AppState, headers: &HeaderMap) -> VisitorContext {
    let header_text = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    };
    let language = header_text(header::ACCEPT_LANGUAGE.as_str())
        .split([',', ';'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    let ip = header_text("x-forwarded-for")
        .split(',')
        .next()
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty());

    let user_type = if state.is_admin(headers).await {
        UserType::Admin
    } else {
        UserType::Visitor
    };

    VisitorContext {
        user_type,
        device: DeviceInfo {
            user_agent: header_text(header::USER_AGENT.as_str()),
            language,
            ip,
        },
    }
}

pub async fn storage_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Lagged receivers skip what they missed; clients reload on the next event.
    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(|event| {
        let event = event.ok()?;
        Event::default().event("storage").json_data(&event).ok().map(Ok)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn admin_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Option<AdvancedStats>>, AppError> {
    require_admin(&state, &headers).await?;
    Ok(Json(
        get_advanced_stats(state.sessions(), state.config.counter_wrap_limit).await,
    ))
}

pub async fn admin_snapshot(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardSnapshot>, AppError> {
    require_admin(&state, &headers).await?;
    Ok(Json(state.dashboard.snapshot().await))
}

pub async fn admin_refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardSnapshot>, AppError> {
    require_admin(&state, &headers).await?;
    state
        .dashboard
        .refresh(state.sessions(), state.config.counter_wrap_limit)
        .await;
    Ok(Json(state.dashboard.snapshot().await))
}

pub async fn admin_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<SessionDetail>, AppError> {
    require_admin(&state, &headers).await?;
    let detail = state
        .dashboard
        .session_detail(state.sessions(), &state.geo, &id)
        .await?;
    Ok(Json(detail))
}

pub async fn export_journal(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.lock().await;
    let text = journal_text(
        &records::load_document(&store),
        &records::load_document(&store),
        &records::list::<JournalEntry>(&store),
    );
    download("text/plain; charset=utf-8", "journal.txt", text.into_bytes())
}

pub async fn export_reports(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.lock().await;
    let pdf = reports_pdf(
        &records::load_document(&store),
        &records::list::<MonthlyReport>(&store),
    );
    download("application/pdf", "monthly-reports.pdf", pdf)
}

pub async fn export_archive(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;
    let store = state.store.lock().await;
    let zip = archive_zip(store.items())?;
    Ok(download("application/zip", "pkl-hub-archive.zip", zip))
}

fn download(content_type: &'static str, filename: &str, body: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
}

async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    if state.is_admin(headers).await {
        Ok(())
    } else {
        Err(AppError::forbidden())
    }
}
