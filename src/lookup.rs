use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde_json::{Map, Value, json};
use tracing::{info, info_span, warn};
use url::Url;

use crate::config::AppSettings;
use crate::error::LookupError;
use crate::username::Username;

/// A profile the service matched to the requested username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileMatch {
    pub name: String,
    /// Identifier exactly as received: hexadecimal, no separators.
    pub id: String,
    pub legacy: bool,
}

/// Outcome of one lookup, used only to drive the display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Found(ProfileMatch),
    NotFound,
    Error,
}

impl LookupResult {
    pub fn label(&self) -> &'static str {
        match self {
            LookupResult::Found(_) => "found",
            LookupResult::NotFound => "not-found",
            LookupResult::Error => "error",
        }
    }
}

impl From<Result<ProfileMatch, LookupError>> for LookupResult {
    fn from(value: Result<ProfileMatch, LookupError>) -> Self {
        match value {
            Ok(profile) => LookupResult::Found(profile),
            Err(LookupError::NotFound) => LookupResult::NotFound,
            Err(_) => LookupResult::Error,
        }
    }
}

pub trait ProfileHttp {
    fn post_json(&self, url: &str, body: &Value) -> Result<Value>;
}

pub struct BlockingProfileHttp {
    client: Client,
}

impl BlockingProfileHttp {
    pub fn from_settings(settings: &AppSettings) -> Result<Self> {
        let mut builder = Client::builder().user_agent(settings.user_agent.clone());
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .context("Failed to build HTTP client for profile lookups")?;
        Ok(Self { client })
    }
}

impl ProfileHttp for BlockingProfileHttp {
    fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        // `json` sets Content-Type: application/json.
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .with_context(|| format!("Failed to reach profile service at {url}"))?;
        if !response.status().is_success() {
            bail!("Profile service {url} returned status {}", response.status());
        }
        response
            .json()
            .context("Profile service returned non-JSON payload")
    }
}

/// Issues single-name lookups against the profile service.
pub struct ProfileLookup<H> {
    endpoint: Url,
    http: H,
}

impl<H: ProfileHttp> ProfileLookup<H> {
    pub fn new(endpoint: &str, http: H) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid profile lookup endpoint {endpoint}"))?;
        Ok(Self { endpoint, http })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn http(&self) -> &H {
        &self.http
    }

    /// Perform one request for `username`. Never retries.
    pub fn lookup(&self, username: &Username) -> LookupResult {
        let span = info_span!("lookup", username = %username);
        let _guard = span.enter();

        let body = request_body(username);
        let result = match self.http.post_json(self.endpoint.as_str(), &body) {
            Ok(response) => LookupResult::from(parse_response(&response)),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "profile lookup request failed");
                LookupResult::Error
            }
        };
        info!(outcome = result.label(), "profile lookup finished");
        result
    }
}

/// JSON body for a lookup: an array holding the one username.
pub fn request_body(username: &Username) -> Value {
    json!([username.as_str()])
}

/// Interpret the service's JSON array. Only the first element is considered.
pub fn parse_response(body: &Value) -> Result<ProfileMatch, LookupError> {
    let entries = body
        .as_array()
        .ok_or_else(|| LookupError::LookupFailed("response is not a JSON array".into()))?;
    let Some(first) = entries.first() else {
        return Err(LookupError::NotFound);
    };
    let object = first
        .as_object()
        .ok_or_else(|| LookupError::LookupFailed("profile entry is not an object".into()))?;
    if !object.contains_key("id") {
        warn!("profile entry carries no id");
        return Err(LookupError::LookupFailed("profile entry has no id".into()));
    }
    extract_profile(object).map_err(|err| {
        warn!(error = %err, "profile entry could not be read");
        err
    })
}

fn extract_profile(object: &Map<String, Value>) -> Result<ProfileMatch, LookupError> {
    let name = string_field(object, "name")?;
    let id = string_field(object, "id")?;
    // Only present when true.
    let legacy = object
        .get("legacy")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Ok(ProfileMatch { name, id, legacy })
}

fn string_field(object: &Map<String, Value>, key: &str) -> Result<String, LookupError> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LookupError::LookupFailed(format!("field `{key}` missing or not a string")))
}
