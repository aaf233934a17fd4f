//! Authenticated request dispatch and status classification.

use crate::domain::ConfigProvider;
use crate::utils::error::{Result, RssError};
use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::Value;
use std::fmt;

pub const BASIC_AUTH_PASSWORD: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn method(&self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Patch => Method::PATCH,
            Self::Delete => Method::DELETE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Codes that carry a payload for this verb.
    pub fn success_codes(&self) -> &'static [u16] {
        match self {
            Self::Post => &[201],
            Self::Put => &[200, 201],
            Self::Get | Self::Patch | Self::Delete => &[200],
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a 404 is treated for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFound {
    Absent,
    Fail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Payload(Value),
    Absent,
}

impl Outcome {
    pub fn into_option(self) -> Option<Value> {
        match self {
            Self::Payload(value) => Some(value),
            Self::Absent => None,
        }
    }
}

/// Map a status onto an outcome. The body is only parsed for success codes;
/// an empty body parses as `null`.
pub fn classify(
    verb: Verb,
    path: &str,
    status: u16,
    not_found: NotFound,
    body: &str,
) -> Result<Outcome> {
    if verb.success_codes().contains(&status) {
        if body.trim().is_empty() {
            return Ok(Outcome::Payload(Value::Null));
        }
        return Ok(Outcome::Payload(serde_json::from_str(body)?));
    }

    if status == 404 && not_found == NotFound::Absent {
        return Ok(Outcome::Absent);
    }

    tracing::warn!("RSS: '{} {}' failed with status = {}", verb, path, status);
    Err(RssError::UnexpectedStatus {
        method: verb,
        path: path.to_string(),
        status,
    })
}

/// Normalise the configured address: add `http://` when no scheme is given
/// and drop trailing slashes.
pub fn base_url(base_uri: &str) -> String {
    let trimmed = base_uri.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Issue one request with basic auth (`secret`, empty password) and the
/// given URL-encoded parameters, then classify the response.
pub fn send<C: ConfigProvider>(
    client: &Client,
    config: &C,
    verb: Verb,
    path: &str,
    params: &[(String, String)],
    not_found: NotFound,
) -> Result<Outcome> {
    let url = format!("{}{}", base_url(config.base_uri()), path);
    tracing::debug!("RSS request: {} {} ({} params)", verb, url, params.len());

    let response = client
        .request(verb.method(), &url)
        .basic_auth(config.secret(), Some(BASIC_AUTH_PASSWORD))
        .query(params)
        .send()?;

    let status = response.status().as_u16();
    tracing::debug!("RSS response: {} {} -> {}", verb, path, status);

    let body = if verb.success_codes().contains(&status) {
        response.text()?
    } else {
        String::new()
    };

    classify(verb, path, status, not_found, &body)
}
