//! Write path: changeset orchestration against the OSM editing API.
//!
//! Every operation shares one skeleton: validate everything upfront,
//! open a changeset, perform the element write(s), then attempt a
//! close on every exit path. A failed close is logged and swallowed;
//! it never shadows the primary outcome.

use crate::tags;
use crate::xml::{self, NodeAttrs};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// `created_by` tag stamped onto every changeset.
const APP_IDENTITY: &str = "chargemap";
const DEFAULT_SOURCE: &str = "survey";

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(20);

pub const DEFAULT_API_BASE: &str = "https://api.openstreetmap.org/api/0.6";

#[derive(thiserror::Error, Debug)]
pub enum EditError {
    #[error("changeset comment required")]
    MissingComment,

    #[error("missing required tags: {}", .0.join(", "))]
    MissingTags(Vec<&'static str>),

    #[error("missing coordinates")]
    MissingCoordinates,

    #[error("unsupported element type: {0}")]
    UnsupportedType(String),

    #[error("missing element id or version")]
    MissingIdOrVersion,

    #[error("batch contains no updates")]
    EmptyBatch,

    #[error("update {index} failed: {source}")]
    BatchItem {
        index: usize,
        #[source]
        source: Box<EditError>,
    },

    #[error("{operation} failed ({status}): {body}")]
    Upstream {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EditError {
    /// True for errors the client can fix by correcting its request;
    /// false for upstream/transport failures.
    pub fn is_validation(&self) -> bool {
        match self {
            Self::MissingComment
            | Self::MissingTags(_)
            | Self::MissingCoordinates
            | Self::UnsupportedType(_)
            | Self::MissingIdOrVersion
            | Self::EmptyBatch => true,
            Self::BatchItem { source, .. } => source.is_validation(),
            Self::Upstream { .. } | Self::Http(_) => false,
        }
    }
}

/// Payload for a new station node.
#[derive(Debug, Deserialize)]
pub struct CreateStation {
    pub comment: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub tags: serde_json::Map<String, Value>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// One element mutation. `version` is the optimistic-concurrency token
/// from a prior read; a stale value makes the upstream write fail and
/// that failure is surfaced untouched.
#[derive(Debug, Deserialize)]
pub struct StationUpdate {
    #[serde(rename = "type")]
    pub element_type: Option<String>,
    pub id: Option<i64>,
    pub version: Option<u64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub tags: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStation {
    pub comment: Option<String>,
    pub source: Option<String>,
    #[serde(flatten)]
    pub update: StationUpdate,
}

#[derive(Debug, Deserialize)]
pub struct BatchUpdate {
    pub comment: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub updates: Vec<StationUpdate>,
}

#[derive(Debug, Serialize)]
pub struct CreateOutcome {
    pub changeset_id: String,
    pub node_id: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateOutcome {
    pub changeset_id: String,
    pub updated: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchOutcome {
    pub changeset_id: String,
    pub updated: usize,
}

/// A [`StationUpdate`] that passed validation.
struct ValidUpdate {
    id: i64,
    version: u64,
    lat: f64,
    lon: f64,
    tags: IndexMap<String, String>,
}

fn validate_update(update: &StationUpdate) -> Result<ValidUpdate, EditError> {
    match update.element_type.as_deref() {
        Some("node") => {}
        other => return Err(EditError::UnsupportedType(other.unwrap_or("").to_string())),
    }
    let (id, version) = match (update.id, update.version) {
        (Some(id), Some(version)) => (id, version),
        _ => return Err(EditError::MissingIdOrVersion),
    };
    let (lat, lon) = match (update.lat, update.lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Err(EditError::MissingCoordinates),
    };
    Ok(ValidUpdate {
        id,
        version,
        lat,
        lon,
        tags: tags::normalize(&update.tags),
    })
}

pub struct EditClient {
    http: reqwest::Client,
    api_base: String,
}

impl EditClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            api_base,
        }
    }

    /// Creates a station node inside a fresh changeset.
    pub async fn create_station(
        &self,
        token: &str,
        req: &CreateStation,
    ) -> Result<CreateOutcome, EditError> {
        let tags = tags::normalize(&req.tags);
        let missing = tags::missing_required(&tags);
        if !missing.is_empty() {
            return Err(EditError::MissingTags(missing));
        }
        require_comment(req.comment.as_deref())?;
        let (lat, lon) = match (req.lat, req.lon) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return Err(EditError::MissingCoordinates),
        };

        let changeset_id = self
            .open_changeset(token, req.comment.as_deref(), req.source.as_deref())
            .await?;
        let body = xml::node_envelope(
            &NodeAttrs {
                changeset: &changeset_id,
                id: None,
                version: None,
                lat: Some(lat),
                lon: Some(lon),
            },
            &tags,
        );
        let result = self
            .put(token, "node/create".to_string(), Some(body), "node create")
            .await;
        self.close_best_effort(token, &changeset_id).await;

        let node_id = result?;
        tracing::info!(changeset_id = %changeset_id, node_id = %node_id, "created station");
        Ok(CreateOutcome {
            changeset_id,
            node_id,
        })
    }

    /// Updates one existing node inside a fresh changeset.
    pub async fn update_station(
        &self,
        token: &str,
        req: &UpdateStation,
    ) -> Result<UpdateOutcome, EditError> {
        let valid = validate_update(&req.update)?;

        let changeset_id = self
            .open_changeset(token, req.comment.as_deref(), req.source.as_deref())
            .await?;
        let result = self.submit_update(token, &changeset_id, &valid).await;
        self.close_best_effort(token, &changeset_id).await;

        result?;
        tracing::info!(changeset_id = %changeset_id, node_id = valid.id, "updated station");
        Ok(UpdateOutcome {
            changeset_id,
            updated: true,
        })
    }

    /// Applies a sequence of node updates inside one shared changeset.
    ///
    /// Items run strictly in order. The first invalid item or upstream
    /// write failure aborts the remainder and is reported with the
    /// item's index; the changeset close is still attempted.
    pub async fn batch_update(
        &self,
        token: &str,
        req: &BatchUpdate,
    ) -> Result<BatchOutcome, EditError> {
        if req.updates.is_empty() {
            return Err(EditError::EmptyBatch);
        }

        let changeset_id = self
            .open_changeset(token, req.comment.as_deref(), req.source.as_deref())
            .await?;

        let mut updated = 0;
        let mut failure = None;
        for (index, update) in req.updates.iter().enumerate() {
            let item = match validate_update(update) {
                Ok(valid) => self.submit_update(token, &changeset_id, &valid).await,
                Err(e) => Err(e),
            };
            match item {
                Ok(()) => updated += 1,
                Err(e) => {
                    failure = Some(EditError::BatchItem {
                        index,
                        source: Box::new(e),
                    });
                    break;
                }
            }
        }
        self.close_best_effort(token, &changeset_id).await;

        match failure {
            Some(e) => Err(e),
            None => {
                tracing::info!(changeset_id = %changeset_id, updated, "batch applied");
                Ok(BatchOutcome {
                    changeset_id,
                    updated,
                })
            }
        }
    }

    async fn open_changeset(
        &self,
        token: &str,
        comment: Option<&str>,
        source: Option<&str>,
    ) -> Result<String, EditError> {
        let comment = require_comment(comment)?;
        let source = source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SOURCE);
        let metadata = [
            ("comment", comment),
            ("created_by", APP_IDENTITY),
            ("source", source),
        ];
        let body = xml::changeset_envelope(metadata.iter().copied());
        self.put(
            token,
            "changeset/create".to_string(),
            Some(body),
            "changeset create",
        )
        .await
    }

    async fn submit_update(
        &self,
        token: &str,
        changeset_id: &str,
        valid: &ValidUpdate,
    ) -> Result<(), EditError> {
        let body = xml::node_envelope(
            &NodeAttrs {
                changeset: changeset_id,
                id: Some(valid.id),
                version: Some(valid.version),
                lat: Some(valid.lat),
                lon: Some(valid.lon),
            },
            &valid.tags,
        );
        self.put(token, format!("node/{}", valid.id), Some(body), "node update")
            .await
            .map(|_| ())
    }

    /// Hygiene step, not part of the success contract: a close failure
    /// is logged and swallowed.
    async fn close_best_effort(&self, token: &str, changeset_id: &str) {
        let path = format!("changeset/{changeset_id}/close");
        if let Err(e) = self.put(token, path, None, "changeset close").await {
            tracing::warn!(changeset_id = %changeset_id, error = %e, "changeset close failed");
        }
    }

    /// PUTs to the editing API and returns the trimmed plain-text body
    /// (the API answers writes with bare identifiers).
    async fn put(
        &self,
        token: &str,
        path: String,
        body: Option<String>,
        operation: &'static str,
    ) -> Result<String, EditError> {
        let mut request = self
            .http
            .put(format!("{}/{path}", self.api_base))
            .bearer_auth(token)
            .timeout(UPSTREAM_TIMEOUT);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EditError::Upstream {
                operation,
                status,
                body,
            });
        }
        Ok(response.text().await?.trim().to_string())
    }
}

fn require_comment(comment: Option<&str>) -> Result<&str, EditError> {
    comment
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(EditError::MissingComment)
}
