use std::{env, path::PathBuf, time::Duration};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/storage.json";
const DEFAULT_REMOTE_URL: &str = "http://127.0.0.1:54321";
const DEFAULT_SESSION_TABLE: &str = "visitor_sessions";
const DEFAULT_GEO_URL: &str = "https://ipapi.co";
const DEFAULT_POLL_SECS: u64 = 30;
const DEFAULT_COUNTER_LIMIT: u64 = 10_000;
const DEFAULT_ADMIN_EMAIL: &str = "admin@pkl.local";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Runtime settings, read once from the environment at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub remote_url: String,
    pub remote_key: String,
    pub session_table: String,
    pub geo_url: String,
    pub poll_interval: Duration,
    pub counter_wrap_limit: u64,
    pub admin_email: String,
    pub admin_password: String,
    pub max_image_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            remote_key: String::new(),
            session_table: DEFAULT_SESSION_TABLE.to_string(),
            geo_url: DEFAULT_GEO_URL.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            counter_wrap_limit: DEFAULT_COUNTER_LIMIT,
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parsed("PORT").unwrap_or(defaults.port),
            data_path: env::var("APP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            remote_url: text("PKL_REMOTE_URL").unwrap_or(defaults.remote_url),
            remote_key: text("PKL_REMOTE_KEY").unwrap_or(defaults.remote_key),
            session_table: text("PKL_SESSION_TABLE").unwrap_or(defaults.session_table),
            geo_url: text("PKL_GEO_URL").unwrap_or(defaults.geo_url),
            poll_interval: parsed::<u64>("PKL_POLL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            // Zero would make the modulo panic.
            counter_wrap_limit: parsed::<u64>("PKL_COUNTER_LIMIT")
                .filter(|limit| *limit > 0)
                .unwrap_or(defaults.counter_wrap_limit),
            admin_email: text("PKL_ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            admin_password: text("PKL_ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            max_image_bytes: parsed("PKL_MAX_IMAGE_BYTES").unwrap_or(defaults.max_image_bytes),
        }
    }
}

fn text(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}
