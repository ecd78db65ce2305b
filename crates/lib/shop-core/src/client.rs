//! Authenticated GraphQL client bound to a single store.
//!
//! The client forwards query documents verbatim and hands back the `data`
//! member of the response. It does not retry, paginate, or cache.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Header carrying the Admin API access token.
pub const ACCESS_TOKEN_HEADER: &str = "x-shopify-access-token";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum ClientError {
    Build(String),
    Transport(reqwest::Error),
    Status { status: u16, body: String },
    Decode(String),
    GraphQl(Vec<String>),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build(message) => write!(f, "failed to build HTTP client: {message}"),
            Self::Transport(err) => write!(f, "request failed: {err}"),
            Self::Status { status, body } => {
                write!(f, "store responded with HTTP {status}: {body}")
            }
            Self::Decode(message) => write!(f, "invalid GraphQL response: {message}"),
            Self::GraphQl(messages) => write!(f, "GraphQL errors: {}", messages.join("; ")),
        }
    }
}

impl Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err)
    }
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: &'a Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

/// GraphQL client for one store's Admin API endpoint.
#[derive(Debug)]
pub struct ShopClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ShopClient {
    /// Builds a client with the access token bound into its default headers.
    ///
    /// # Errors
    /// Returns [`ClientError::Build`] when the credential is not a valid header
    /// value or the HTTP client cannot be constructed.
    pub fn new(domain: &str, api_version: &str, credential: &str) -> Result<Self, ClientError> {
        let mut token = HeaderValue::from_str(credential)
            .map_err(|err| ClientError::Build(format!("invalid access token: {err}")))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCESS_TOKEN_HEADER, token);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ClientError::Build(err.to_string()))?;

        Ok(Self {
            http,
            endpoint: graphql_endpoint(domain, api_version),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issues one GraphQL request and returns the response `data`.
    ///
    /// # Errors
    /// Returns transport failures, non-success HTTP statuses, undecodable
    /// bodies, and top-level GraphQL errors.
    pub async fn execute(&self, query: &str, variables: Value) -> Result<Value, ClientError> {
        debug!(endpoint = %self.endpoint, "issuing GraphQL request");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&GraphQlRequest {
                query,
                variables: &variables,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GraphQlResponse = response
            .json()
            .await
            .map_err(|err| ClientError::Decode(err.to_string()))?;
        into_data(payload)
    }
}

/// Builds the Admin GraphQL endpoint, tolerating a scheme or trailing slash on
/// the configured domain.
#[must_use]
pub fn graphql_endpoint(domain: &str, api_version: &str) -> String {
    let host = domain.trim();
    let host = host
        .strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host)
        .trim_end_matches('/');
    format!("https://{host}/admin/api/{api_version}/graphql.json")
}

fn into_data(payload: GraphQlResponse) -> Result<Value, ClientError> {
    if !payload.errors.is_empty() {
        return Err(ClientError::GraphQl(
            payload.errors.into_iter().map(|entry| entry.message).collect(),
        ));
    }
    payload
        .data
        .ok_or_else(|| ClientError::Decode("response carried no data".to_string()))
}
