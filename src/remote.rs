use crate::config::Config;
use crate::errors::RemoteError;
use crate::models::{SessionActivity, VisitorSession};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// Client for the hosted session table, spoken in the PostgREST dialect.
#[derive(Clone)]
pub struct SessionTable {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl SessionTable {
    pub fn new(client: Client, base_url: &str, table: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: format!("{}/rest/v1/{table}", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(client: Client, config: &Config) -> Self {
        Self::new(
            client,
            &config.remote_url,
            &config.session_table,
            config.remote_key.clone(),
        )
    }

    /// Inserts the session, merging into an existing row with the same id.
    pub async fn upsert(&self, session: &VisitorSession) -> Result<(), RemoteError> {
        let request = self
            .client
            .post(&self.endpoint)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(session);
        self.send(request).await?;
        Ok(())
    }

    pub async fn fetch(&self, id: &str) -> Result<VisitorSession, RemoteError> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("id", format!("eq.{id}")), ("select", "*".to_string())]);
        let rows: Vec<VisitorSession> = decode(self.send(request).await?).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    pub async fn fetch_all(&self) -> Result<Vec<VisitorSession>, RemoteError> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*"), ("order", "last_activity.desc")]);
        decode(self.send(request).await?).await
    }

    pub async fn update_activity(
        &self,
        id: &str,
        activity: &SessionActivity<'_>,
    ) -> Result<(), RemoteError> {
        let request = self
            .client
            .patch(&self.endpoint)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=minimal")
            .json(activity);
        self.send(request).await?;
        Ok(())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.headers(self.auth_headers()).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        // An unprintable key is sent without credentials; the remote rejects it.
        if let Ok(value) = HeaderValue::from_str(&self.api_key) {
            headers.insert("apikey", value);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }
}

pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
