use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct JournalEntry {
    id: i64,
    date: String,
    activity: String,
    description: String,
}

struct TestServer {
    base_url: String,
    data_path: PathBuf,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_file(&self.data_path);
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("pkl_hub_http_{}_{}.json", std::process::id(), nanos));
    path
}

async fn wait_until_ready(base_url: &str) {
    let client = browser();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_pkl_hub"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", &data_path)
        .env("PKL_REMOTE_URL", format!("http://127.0.0.1:{}", pick_free_port()))
        .env("PKL_ADMIN_EMAIL", "mentor@example.com")
        .env("PKL_ADMIN_PASSWORD", "s3cret")
        .env("PKL_MAX_IMAGE_BYTES", "64")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer {
        base_url,
        data_path,
        child,
    }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

/// A client that keeps cookies, like one browser.
fn browser() -> Client {
    Client::builder().cookie_store(true).build().unwrap()
}

async fn login(client: &Client, server: &TestServer) {
    let response = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "email": "mentor@example.com", "password": "s3cret" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

async fn logout(client: &Client, server: &TestServer) {
    let response = client
        .post(format!("{}/api/auth/logout", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

async fn journal(client: &Client, server: &TestServer) -> Vec<JournalEntry> {
    client
        .get(format!("{}/api/journal", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

fn stored_items(server: &TestServer) -> BTreeMap<String, String> {
    let bytes = std::fs::read(&server.data_path).expect("storage file written");
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn http_journal_changes_persist_whole_collection() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = browser();
    login(&client, &server).await;

    let before = journal(&client, &server).await;
    for activity in ["Orientation", "Rack cabling", "Firewall review"] {
        let response = client
            .post(format!("{}/api/journal", server.base_url))
            .json(&json!({ "date": "2025-01-06", "activity": activity, "description": "day notes" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let entries = journal(&client, &server).await;
    assert_eq!(entries.len(), before.len() + 3);

    let stored: Vec<JournalEntry> =
        serde_json::from_str(&stored_items(&server)["journalEntries"]).unwrap();
    assert_eq!(stored, entries);

    let middle = entries[entries.len() - 2].id;
    let unconfirmed = client
        .delete(format!("{}/api/journal/{middle}", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(unconfirmed.status(), StatusCode::CONFLICT);
    assert_eq!(journal(&client, &server).await.len(), entries.len());

    let confirmed = client
        .delete(format!("{}/api/journal/{middle}?confirm=true", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(confirmed.status(), StatusCode::NO_CONTENT);

    let after = journal(&client, &server).await;
    let expected: Vec<&JournalEntry> = entries.iter().filter(|e| e.id != middle).collect();
    assert_eq!(after.iter().collect::<Vec<_>>(), expected);
}

#[tokio::test]
async fn http_required_fields_are_enforced() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = browser();
    login(&client, &server).await;

    let response = client
        .post(format!("{}/api/reports", server.base_url))
        .json(&json!({ "month": "2025-01", "title": "January" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "content is required");
}

#[tokio::test]
async fn http_writes_need_admin() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = browser();
    logout(&client, &server).await;

    let response = client
        .put(format!("{}/api/profile", server.base_url))
        .json(&json!({ "name": "Sari" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let bad_login = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "email": "mentor@example.com", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_login.status(), StatusCode::UNAUTHORIZED);

    let me: Value = client
        .get(format!("{}/api/auth/me", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["is_admin"], false);
}

#[tokio::test]
async fn http_admin_access_is_per_browser() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let admin = browser();
    let visitor = browser();
    login(&admin, &server).await;

    let profile = json!({ "name": "Sari Wulandari", "bio": "Network intern" });
    let allowed = admin
        .put(format!("{}/api/profile", server.base_url))
        .json(&profile)
        .send()
        .await
        .unwrap();
    assert!(allowed.status().is_success());
    assert_eq!(stored_items(&server)["isAdmin"], "true");

    let denied = visitor
        .put(format!("{}/api/profile", server.base_url))
        .json(&json!({ "name": "Someone else" }))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let stats = visitor
        .get(format!("{}/api/admin/stats", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(stats.status(), StatusCode::FORBIDDEN);

    let forged = visitor
        .delete(format!("{}/api/journal/1?confirm=true", server.base_url))
        .header("cookie", "pkl_admin=forged")
        .send()
        .await
        .unwrap();
    assert_eq!(forged.status(), StatusCode::FORBIDDEN);

    let me: Value = visitor
        .get(format!("{}/api/auth/me", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["is_admin"], false);

    logout(&admin, &server).await;
    let after_logout = admin
        .put(format!("{}/api/profile", server.base_url))
        .json(&profile)
        .send()
        .await
        .unwrap();
    assert_eq!(after_logout.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn http_profile_round_trips_through_storage() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = browser();
    login(&client, &server).await;

    let response = client
        .put(format!("{}/api/profile", server.base_url))
        .json(&json!({ "name": "Sari Wulandari", "school": "SMK Negeri 1", "major": "TKJ" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let profile: Value = client
        .get(format!("{}/api/profile", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["name"], "Sari Wulandari");
    assert_eq!(profile["major"], "TKJ");

    let stored: Value = serde_json::from_str(&stored_items(&server)["studentProfile"]).unwrap();
    assert_eq!(stored, profile);

    let page = client
        .get(&server.base_url)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Sari Wulandari"));
}

#[tokio::test]
async fn http_gallery_limits_image_size() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = browser();
    login(&client, &server).await;

    let small = client
        .post(format!("{}/api/gallery", server.base_url))
        .json(&json!({ "title": "Server room", "image": "data:image/png;base64,iVBORw==" }))
        .send()
        .await
        .unwrap();
    assert_eq!(small.status(), StatusCode::CREATED);

    let big_payload = "A".repeat(200);
    let big = client
        .post(format!("{}/api/gallery", server.base_url))
        .json(&json!({ "title": "Too big", "image": format!("data:image/png;base64,{big_payload}") }))
        .send()
        .await
        .unwrap();
    assert_eq!(big.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn http_tracking_is_fire_and_forget() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = browser();

    for route in ["/api/track/session", "/api/track"] {
        let response = client
            .post(format!("{}{route}", server.base_url))
            .header("user-agent", "Mozilla/5.0 (iPhone)")
            .json(&json!({ "tab_id": "tab-1", "path": "/journal" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    let missing = client
        .post(format!("{}/api/track", server.base_url))
        .json(&json!({ "tab_id": " ", "path": "/" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_admin_stats_are_null_when_remote_is_down() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = browser();
    login(&client, &server).await;

    let stats: Value = client
        .get(format!("{}/api/admin/stats", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(stats.is_null());
}

#[tokio::test]
async fn http_exports_download() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = browser();

    let pdf = client
        .get(format!("{}/api/export/reports.pdf", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(pdf.headers()["content-type"], "application/pdf");
    assert!(pdf.bytes().await.unwrap().starts_with(b"%PDF"));

    let text = client
        .get(format!("{}/api/export/journal.txt", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.starts_with("INTERNSHIP JOURNAL"));
}

#[tokio::test]
async fn http_music_preference_persists() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = browser();

    let response = client
        .put(format!("{}/api/preferences/music", server.base_url))
        .json(&json!({ "playing": true }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let pref: Value = client
        .get(format!("{}/api/preferences/music", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pref["playing"], true);
    assert_eq!(stored_items(&server)["musicPlaying"], "true");
}
