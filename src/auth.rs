use axum::http::{header, HeaderMap};
use std::collections::HashSet;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const ADMIN_COOKIE: &str = "pkl_admin";

/// Admin sign-ins, one random token per browser.
///
/// The token travels in an `HttpOnly` cookie. Tokens live in memory, so a
/// restart signs everyone out.
#[derive(Default)]
pub struct AdminSessions {
    tokens: Mutex<HashSet<String>>,
}

impl AdminSessions {
    pub async fn issue(&self) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.lock().await.insert(token.clone());
        token
    }

    /// Forgets `token` and reports whether any sign-in is still active.
    pub async fn revoke(&self, token: &str) -> bool {
        let mut tokens = self.tokens.lock().await;
        tokens.remove(token);
        !tokens.is_empty()
    }

    pub async fn is_valid(&self, token: &str) -> bool {
        self.tokens.lock().await.contains(token)
    }

    /// True when the request carries a live admin cookie.
    pub async fn check(&self, headers: &HeaderMap) -> bool {
        match cookie_token(headers) {
            Some(token) => self.is_valid(token).await,
            None => false,
        }
    }
}

pub fn cookie_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == ADMIN_COOKIE)
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
}

pub fn session_cookie(token: &str) -> String {
    format!("{ADMIN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

pub fn expired_cookie() -> String {
    format!("{ADMIN_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
