//! Character sheet service client
//!
//! Fetches a character from the D&D Beyond character service and extracts
//! the fields the tracker needs:
//! - Display name (falls back to "Character <id>")
//! - Dexterity score, from the stat entry with ability id 2
//!
//! The dexterity modifier is always computed locally from the score.
//! Requests can be routed through a CORS relay (`<relay>/fetch?url=...`).

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::combat::CharacterRecord;

/// Default character service origin
pub const DEFAULT_CHARACTER_SERVICE: &str = "https://character-service.dndbeyond.com";

/// Ability id of dexterity in the sheet's `stats` array
const DEXTERITY_ABILITY_ID: f64 = 2.0;

/// Why a character could not be imported
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Character id is empty")]
    EmptyId,
    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),
    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("Fetch failed ({0})")]
    Status(u16),
    #[error("Failed to parse response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("Character data missing")]
    MissingData,
}

/// Client for the character sheet service
#[derive(Debug, Clone)]
pub struct DdbClient {
    client: Client,
    service_url: String,
    relay_origin: Option<String>,
}

impl DdbClient {
    /// Create a client for `service_url`, optionally routed through a relay
    pub fn new(
        service_url: impl Into<String>,
        relay_origin: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            service_url: service_url.into(),
            relay_origin: relay_origin.filter(|o| !o.trim().is_empty()),
        })
    }

    /// Whether requests go through a relay
    pub fn uses_relay(&self) -> bool {
        self.relay_origin.is_some()
    }

    /// Direct URL of a character on the service
    pub fn character_url(&self, id: &str) -> Result<Url, FetchError> {
        let mut url = parse_url(&self.service_url)?;
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.service_url.clone()))?
            .pop_if_empty()
            .extend(["character", "v5", "character", id]);
        url.set_query(Some("includeCustomItems=true"));
        Ok(url)
    }

    /// URL actually requested: the character URL, or the relay wrapping it
    pub fn request_url(&self, id: &str) -> Result<Url, FetchError> {
        let target = self.character_url(id)?;
        let Some(relay) = &self.relay_origin else {
            return Ok(target);
        };

        let mut url = parse_url(relay)?;
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(relay.clone()))?
            .pop_if_empty()
            .push("fetch");
        url.query_pairs_mut().append_pair("url", target.as_str());
        Ok(url)
    }

    /// Fetch and extract a character record
    pub async fn fetch_character(&self, id: &str) -> Result<CharacterRecord, FetchError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(FetchError::EmptyId);
        }

        let url = self.request_url(id)?;
        debug!("Fetching character {} from {}", id, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            warn!("Character service error for {}: {}", id, status);
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(FetchError::Request)?;
        let json: Value = serde_json::from_slice(&body).map_err(FetchError::Decode)?;
        parse_character(id, &json)
    }
}

fn parse_url(raw: &str) -> Result<Url, FetchError> {
    Url::parse(raw).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", raw, e)))
}

/// Extract a character record from a service response body
pub fn parse_character(id: &str, body: &Value) -> Result<CharacterRecord, FetchError> {
    let data = body
        .get("data")
        .filter(|d| d.is_object())
        .ok_or(FetchError::MissingData)?;

    let name = data
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Character {}", id));

    let dex_score = data
        .get("stats")
        .and_then(Value::as_array)
        .and_then(|stats| stats.iter().find(|s| is_dexterity(s)))
        .and_then(|stat| {
            stat.get("value")
                .and_then(json_int)
                .or_else(|| stat.get("score").and_then(json_int))
        });

    Ok(CharacterRecord {
        id: id.to_string(),
        name,
        dex_score,
    })
}

fn is_dexterity(stat: &Value) -> bool {
    ["id", "abilityId"]
        .iter()
        .any(|key| stat.get(key).and_then(Value::as_f64) == Some(DEXTERITY_ABILITY_ID))
}

/// Integer value of a JSON number, ignoring non-integral numbers
fn json_int(value: &Value) -> Option<i32> {
    if let Some(i) = value.as_i64() {
        return i32::try_from(i).ok();
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() <= i32::MAX as f64)
        .map(|f| f as i32)
}
