use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LocationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

/// Optional coordinates for map grounding. Never fails: anything that goes
/// wrong ends up as `None`.
#[derive(Clone)]
pub struct LocationHint {
    http_client: HttpClient,
    fixed: Option<LatLng>,
    lookup_url: Option<String>,
    timeout: Duration,
}

impl LocationHint {
    pub fn new(http_client: HttpClient, config: &LocationConfig) -> Self {
        Self {
            http_client,
            fixed: config.fixed.map(|(latitude, longitude)| LatLng {
                latitude,
                longitude,
            }),
            lookup_url: config.lookup_url.clone(),
            timeout: config.timeout,
        }
    }

    pub async fn resolve(&self) -> Option<LatLng> {
        if let Some(fixed) = self.fixed {
            return Some(fixed);
        }
        let url = self.lookup_url.as_deref()?;

        match tokio::time::timeout(self.timeout, self.lookup(url)).await {
            Ok(Ok(position)) => {
                debug!(target: "location", ?position, "location hint resolved");
                Some(position)
            }
            Ok(Err(err)) => {
                warn!(target: "location", error = %err, "location lookup failed, continuing without it");
                None
            }
            Err(_) => {
                warn!(target: "location", timeout = ?self.timeout, "location lookup timed out, continuing without it");
                None
            }
        }
    }

    async fn lookup(&self, url: &str) -> reqwest::Result<LatLng> {
        let body: LookupResponse = self
            .http_client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(LatLng {
            latitude: body.latitude,
            longitude: body.longitude,
        })
    }
}

/// Accepts both `{latitude, longitude}` and the `{lat, lon}` shape of IP lookup services.
#[derive(Deserialize)]
struct LookupResponse {
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn hint(fixed: Option<(f64, f64)>, lookup_url: Option<String>, timeout: Duration) -> LocationHint {
        LocationHint::new(
            HttpClient::new(),
            &LocationConfig {
                fixed,
                lookup_url,
                timeout,
            },
        )
    }

    #[tokio::test]
    async fn fixed_coordinates_win() {
        let hint = hint(Some((20.67, -103.35)), None, Duration::from_secs(1));
        assert_eq!(
            hint.resolve().await,
            Some(LatLng {
                latitude: 20.67,
                longitude: -103.35
            })
        );
    }

    #[tokio::test]
    async fn nothing_configured_means_no_hint() {
        assert_eq!(hint(None, None, Duration::from_secs(1)).resolve().await, None);
    }

    #[tokio::test]
    async fn lookup_accepts_ip_service_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "lat": 19.43,
                "lon": -99.13
            })))
            .mount(&server)
            .await;

        let hint = hint(None, Some(format!("{}/json", server.uri())), Duration::from_secs(2));
        let position = hint.resolve().await.unwrap();
        assert_eq!(position.latitude, 19.43);
        assert_eq!(position.longitude, -99.13);
    }

    #[tokio::test]
    async fn slow_or_broken_lookup_degrades_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"lat": 1.0, "lon": 2.0}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let slow = hint(None, Some(format!("{}/slow", server.uri())), Duration::from_millis(100));
        assert_eq!(slow.resolve().await, None);

        let broken = hint(None, Some(format!("{}/broken", server.uri())), Duration::from_secs(2));
        assert_eq!(broken.resolve().await, None);
    }
}
