// Player identity lookup against the MLB Stats API people-search endpoint.
//
// A (first name, last name) pair resolves to the MLBAM identifier of the
// first candidate the service returns. A miss is an ordinary result variant,
// not an error; only transport-level failures surface as `Err`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::ProviderEndpoint;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A free-form name pair as entered on the dashboard. No normalization is
/// applied; matching behavior is owned by the lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerQuery {
    pub first_name: String,
    pub last_name: String,
}

impl PlayerQuery {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// The label used for this player everywhere downstream (summaries,
    /// trend series, export file names). Built from the query, not from the
    /// service's canonical spelling.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

/// A resolved player identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    /// MLBAM identifier. Opaque to this crate; only passed through to the
    /// statistics provider.
    pub id: u64,
    pub display_name: String,
}

/// Outcome of a lookup. A miss is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Match(PlayerIdentity),
    NotFound,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup transport failure: {message}")]
    Transport { message: String },

    #[error("lookup service returned status {status}")]
    Status { status: u16 },

    #[error("failed to decode lookup response: {message}")]
    Decode { message: String },
}

// ---------------------------------------------------------------------------
// Service trait
// ---------------------------------------------------------------------------

/// Seam for the external identity collaborator, so the comparison
/// orchestrator can be exercised with in-process fakes.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn resolve(&self, query: &PlayerQuery) -> Result<LookupOutcome, LookupError>;
}

// ---------------------------------------------------------------------------
// MlbLookupClient
// ---------------------------------------------------------------------------

/// HTTP client for the MLB Stats API people-search endpoint.
pub struct MlbLookupClient {
    http: reqwest::Client,
    base_url: String,
}

impl MlbLookupClient {
    /// Create a client with the given base URL and request timeout.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(endpoint: &ProviderEndpoint) -> Result<Self, reqwest::Error> {
        Self::new(
            endpoint.base_url.clone(),
            Duration::from_secs(endpoint.timeout_secs),
        )
    }
}

#[async_trait]
impl IdentityService for MlbLookupClient {
    async fn resolve(&self, query: &PlayerQuery) -> Result<LookupOutcome, LookupError> {
        let names = query.display_name();
        let url = format!("{}/api/v1/people/search", self.base_url);
        debug!(%url, %names, "looking up player identity");

        let response = self
            .http
            .get(&url)
            .query(&[("names", names.as_str())])
            .send()
            .await
            .map_err(|e| LookupError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| LookupError::Transport {
            message: e.to_string(),
        })?;

        let v: Value = serde_json::from_str(&body).map_err(|e| LookupError::Decode {
            message: e.to_string(),
        })?;

        match first_person_id(&v) {
            Some(id) => Ok(LookupOutcome::Match(PlayerIdentity {
                id,
                display_name: names,
            })),
            None => Ok(LookupOutcome::NotFound),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON parsing helpers
// ---------------------------------------------------------------------------

/// Extract the identifier of the first candidate from a people-search
/// response.
///
/// Expected shape: `{ "people": [ { "id": N, ... }, ... ] }`. The service
/// ranks candidates; only the first is consumed here.
pub(crate) fn first_person_id(v: &Value) -> Option<u64> {
    v.get("people")?.get(0)?.get("id")?.as_u64()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
