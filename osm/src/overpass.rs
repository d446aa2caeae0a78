//! Read path: bounding-box queries for charging stations against the
//! public Overpass mirrors. Mirrors are tried in configured order and
//! the first success wins; there is no caching and no backoff, only
//! single-pass ordered exhaustion.

use serde_json::Value;
use std::time::Duration;

const MIRROR_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_MIRRORS: &[&str] = &[
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://overpass.nchc.org.tw/api/interpreter",
];

#[derive(thiserror::Error, Debug)]
pub enum OverpassError {
    #[error("invalid bounding box: {0}")]
    InvalidBbox(String),

    #[error("all {tried} Overpass mirrors failed, last: {last}")]
    Unavailable { tried: usize, last: String },
}

/// West/south/east/north query rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bbox {
    /// Parses a `west,south,east,north` string. Exactly four parseable
    /// floats are required.
    pub fn parse(raw: &str) -> Result<Self, OverpassError> {
        let parts: Vec<f64> = raw
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| OverpassError::InvalidBbox(raw.to_string()))?;
        match parts[..] {
            [west, south, east, north] => Ok(Self {
                west,
                south,
                east,
                north,
            }),
            _ => Err(OverpassError::InvalidBbox(raw.to_string())),
        }
    }
}

/// Fixed query: charging-station nodes in the box, with center
/// coordinates, tags, and metadata.
fn build_query(bbox: &Bbox) -> String {
    format!(
        "[out:json][timeout:25];\n(\n  node[\"amenity\"=\"charging_station\"]({},{},{},{});\n);\nout center tags meta;",
        bbox.south, bbox.west, bbox.north, bbox.east
    )
}

pub struct OverpassClient {
    http: reqwest::Client,
    mirrors: Vec<String>,
}

impl OverpassClient {
    pub fn new(mirrors: Vec<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            mirrors,
        }
    }

    /// Queries each mirror in order and returns the first successful
    /// response verbatim. Every failure is recorded; when all mirrors
    /// are exhausted the last failure is surfaced for diagnostics.
    pub async fn charging_stations(&self, bbox: &Bbox) -> Result<Value, OverpassError> {
        let query = build_query(bbox);
        let mut last_failure = "no mirrors configured".to_string();

        for mirror in &self.mirrors {
            let result = self
                .http
                .post(mirror)
                .body(query.clone())
                .timeout(MIRROR_TIMEOUT)
                .send()
                .await;

            let response = match result {
                Ok(r) => r,
                Err(e) => {
                    last_failure = if e.is_timeout() {
                        format!("{mirror}: timed out")
                    } else {
                        format!("{mirror}: {e}")
                    };
                    tracing::warn!(mirror = %mirror, error = %last_failure, "Overpass mirror unreachable");
                    continue;
                }
            };

            if !response.status().is_success() {
                last_failure = format!("{mirror} returned {}", response.status());
                tracing::warn!(mirror = %mirror, status = %response.status(), "Overpass mirror error");
                continue;
            }

            match response.json::<Value>().await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    last_failure = format!("{mirror}: invalid response body: {e}");
                    tracing::warn!(mirror = %mirror, error = %e, "Overpass response not JSON");
                }
            }
        }

        Err(OverpassError::Unavailable {
            tried: self.mirrors.len(),
            last: last_failure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::serve;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn bbox_parses_four_floats() {
        let bbox = Bbox::parse("13.3,52.4,13.5,52.6").unwrap();
        assert_eq!(bbox.west, 13.3);
        assert_eq!(bbox.south, 52.4);
        assert_eq!(bbox.east, 13.5);
        assert_eq!(bbox.north, 52.6);
    }

    #[test]
    fn bbox_rejects_malformed_input() {
        for raw in ["", "1,2,3", "1,2,3,4,5", "a,b,c,d", "1,,3,4"] {
            assert!(matches!(
                Bbox::parse(raw),
                Err(OverpassError::InvalidBbox(_))
            ));
        }
    }

    #[test]
    fn query_orders_coordinates_south_west_north_east() {
        let bbox = Bbox::parse("13.3,52.4,13.5,52.6").unwrap();
        assert!(build_query(&bbox).contains("(52.4,13.3,52.6,13.5)"));
    }

    fn failing_mirror() -> Router {
        Router::new().route(
            "/",
            post(|| async { axum::http::StatusCode::SERVICE_UNAVAILABLE }),
        )
    }

    #[tokio::test]
    async fn falls_back_to_next_mirror_and_stops_at_first_success() {
        let bad = serve(failing_mirror()).await;
        let good = serve(Router::new().route(
            "/",
            post(|| async { Json(json!({"elements": [{"id": 1}]})) }),
        ))
        .await;

        let never_called = Arc::new(AtomicUsize::new(0));
        let counter = never_called.clone();
        let third = serve(Router::new().route(
            "/",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"elements": []}))
                }
            }),
        ))
        .await;

        let client = OverpassClient::new(vec![
            format!("http://{bad}/"),
            format!("http://{good}/"),
            format!("http://{third}/"),
        ]);
        let bbox = Bbox::parse("1,2,3,4").unwrap();
        let body = client.charging_stations(&bbox).await.unwrap();

        assert_eq!(body["elements"][0]["id"], 1);
        assert_eq!(never_called.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausting_all_mirrors_reports_last_failure() {
        let first = serve(failing_mirror()).await;
        let second = serve(failing_mirror()).await;

        let client =
            OverpassClient::new(vec![format!("http://{first}/"), format!("http://{second}/")]);
        let bbox = Bbox::parse("1,2,3,4").unwrap();
        let err = client.charging_stations(&bbox).await.unwrap_err();

        match err {
            OverpassError::Unavailable { tried, last } => {
                assert_eq!(tried, 2);
                assert!(last.contains(&second.to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
