use crate::errors::RemoteError;
use crate::models::GeoInfo;
use crate::remote::decode;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct GeoPayload {
    #[serde(default)]
    ip: String,
    country_name: Option<String>,
    city: Option<String>,
    org: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

/// Third-party IP geolocation lookup (ipapi.co response shape).
#[derive(Clone)]
pub struct GeoClient {
    client: Client,
    base_url: String,
}

impl GeoClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Without an ip the service reports on the caller's own address.
    pub async fn lookup(&self, ip: Option<&str>) -> Result<GeoInfo, RemoteError> {
        let url = match ip {
            Some(ip) => format!("{}/{ip}/json/", self.base_url),
            None => format!("{}/json/", self.base_url),
        };
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let payload: GeoPayload = decode(response).await?;
        if payload.error {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: payload.reason.unwrap_or_else(|| "lookup refused".to_string()),
            });
        }

        Ok(GeoInfo {
            ip: payload.ip,
            country: payload.country_name,
            city: payload.city,
            org: payload.org,
            latitude: payload.latitude,
            longitude: payload.longitude,
        })
    }

    pub async fn try_lookup(&self, ip: Option<&str>) -> Option<GeoInfo> {
        match self.lookup(ip).await {
            Ok(info) => Some(info),
            Err(err) => {
                warn!("geolocation lookup failed: {err}");
                None
            }
        }
    }
}

pub fn map_embed_url(info: &GeoInfo) -> Option<String> {
    let (lat, lon) = (info.latitude?, info.longitude?);
    Some(format!(
        "https://maps.google.com/maps?q={lat},{lon}&z=12&output=embed"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(latitude: Option<f64>, longitude: Option<f64>) -> GeoInfo {
        GeoInfo {
            ip: "203.0.113.7".to_string(),
            country: Some("Indonesia".to_string()),
            city: Some("Bandung".to_string()),
            org: None,
            latitude,
            longitude,
        }
    }

    #[test]
    fn map_url_uses_coordinates() {
        let url = map_embed_url(&info(Some(-6.9175), Some(107.6191))).unwrap();
        assert_eq!(
            url,
            "https://maps.google.com/maps?q=-6.9175,107.6191&z=12&output=embed"
        );
    }

    #[test]
    fn map_url_needs_both_coordinates() {
        assert!(map_embed_url(&info(Some(-6.9), None)).is_none());
        assert!(map_embed_url(&info(None, None)).is_none());
    }
}
