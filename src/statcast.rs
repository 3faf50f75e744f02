// Pitch event retrieval from the Baseball Savant statcast-search CSV endpoint.
//
// One request per (pitcher, date range). The response body is kept verbatim
// for CSV export while a typed subset of each row feeds the aggregation
// engine. Malformed rows are skipped, not fatal; missing cells become `None`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ProviderEndpoint;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// An inclusive calendar date window. Never validated locally: a reversed
/// range is passed through and yields an empty result set from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One recorded pitch. Fields the provider left blank are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchEvent {
    pub game_date: NaiveDate,
    pub pitch_type: Option<String>,
    pub release_speed: Option<f64>,
    pub plate_x: Option<f64>,
    pub plate_z: Option<f64>,
}

/// The fetch result for one pitcher: typed events for aggregation plus the
/// unmodified response body for export.
#[derive(Debug, Clone)]
pub struct PitchData {
    pub events: Vec<PitchEvent>,
    pub raw_csv: String,
}

impl PitchData {
    /// Parse a statcast CSV body into typed events, retaining the body.
    ///
    /// Rows that fail to deserialize are skipped with a warning; an empty
    /// body (or header-only body) parses to zero events, which is a valid
    /// non-error outcome.
    pub fn from_csv(raw_csv: String) -> Result<Self, csv::Error> {
        let events = parse_events(raw_csv.as_bytes())?;
        Ok(Self { events, raw_csv })
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("statcast transport failure: {message}")]
    Transport { message: String },

    #[error("statcast provider returned status {status}")]
    Status { status: u16 },

    #[error("failed to decode statcast response: {message}")]
    Decode { message: String },
}

// ---------------------------------------------------------------------------
// Service trait
// ---------------------------------------------------------------------------

/// Seam for the external statistics provider.
#[async_trait]
pub trait PitchSource: Send + Sync {
    async fn fetch(&self, player_id: u64, range: &DateRange) -> Result<PitchData, FetchError>;
}

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private) — Savant column names
// ---------------------------------------------------------------------------

/// Statcast search row. Only the columns the aggregation engine consumes are
/// typed; the remaining ~90 columns stay in the raw body for export.
#[derive(Debug, Deserialize)]
struct RawSavantRow {
    game_date: NaiveDate,
    #[serde(deserialize_with = "de_opt_code")]
    pitch_type: Option<String>,
    #[serde(deserialize_with = "de_opt_f64")]
    release_speed: Option<f64>,
    #[serde(deserialize_with = "de_opt_f64")]
    plate_x: Option<f64>,
    #[serde(deserialize_with = "de_opt_f64")]
    plate_z: Option<f64>,
}

/// Savant writes missing numerics as an empty cell or the literal `null`;
/// both become `None`. Non-finite values are treated as missing rather than
/// allowed to poison downstream means.
fn de_opt_f64<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("null") => Ok(None),
        Some(s) => match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            Ok(_) => Ok(None),
            Err(e) => Err(serde::de::Error::custom(e)),
        },
    }
}

/// Missing categorical codes (empty or `null`) become `None`.
fn de_opt_code<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("null") => Ok(None),
        Some(s) => Ok(Some(s.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Reader-based parser (private, enables testing without a server)
// ---------------------------------------------------------------------------

fn parse_events<R: std::io::Read>(rdr: R) -> Result<Vec<PitchEvent>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut events = Vec::new();
    for result in reader.deserialize::<RawSavantRow>() {
        match result {
            Ok(raw) => {
                events.push(PitchEvent {
                    game_date: raw.game_date,
                    pitch_type: raw.pitch_type,
                    release_speed: raw.release_speed,
                    plate_x: raw.plate_x,
                    plate_z: raw.plate_z,
                });
            }
            Err(e) => {
                warn!("skipping malformed statcast row: {}", e);
            }
        }
    }
    Ok(events)
}

// ---------------------------------------------------------------------------
// SavantClient
// ---------------------------------------------------------------------------

/// HTTP client for the statcast-search CSV endpoint.
pub struct SavantClient {
    http: reqwest::Client,
    base_url: String,
}

impl SavantClient {
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
impl PitchSource for SavantClient {
    async fn fetch(&self, player_id: u64, range: &DateRange) -> Result<PitchData, FetchError> {
        let url = format!("{}/statcast_search/csv", self.base_url);
        let start = range.start.format("%Y-%m-%d").to_string();
        let end = range.end.format("%Y-%m-%d").to_string();
        debug!(%url, player_id, %start, %end, "fetching pitch events");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("all", "true"),
                ("type", "details"),
                ("player_type", "pitcher"),
                ("pitchers_lookup[]", &player_id.to_string()),
                ("game_date_gt", &start),
                ("game_date_lt", &end),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Transport {
            message: e.to_string(),
        })?;

        PitchData::from_csv(body).map_err(|e| FetchError::Decode {
            message: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
