//! HTTP fetch-and-classify helper.
//!
//! [`load`] issues a `GET` (no payload) or a `POST` with a JSON body, then
//! classifies the response by `Content-Type`: JSON bodies are parsed into
//! [`Loaded::data`], everything else is read into [`Loaded::text`]. Failures
//! never surface as `Err`; they are reported through [`Loaded::error`].

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde_json::{Map, Value};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Status reported when no HTTP response was received at all.
pub const NETWORK_FAILURE_STATUS: u16 = 500;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("reading response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// The classified result of a fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    /// `None` for 2xx; the status reason (or failure message) otherwise.
    pub error: Option<String>,
    pub status: u16,
    /// Parsed body of a JSON response. `None` if the body was not valid JSON.
    pub data: Option<Value>,
    /// Body of a non-JSON response.
    pub text: Option<String>,
}

impl Loaded {
    fn network_failure(err: &FetchError) -> Self {
        Self {
            error: Some(err.to_string()),
            status: NETWORK_FAILURE_STATUS,
            data: None,
            text: None,
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Flatten into `{error, status, data, text, ...data}`.
    ///
    /// `error` is `false` on success. Members of an object `data` are spread
    /// into the top level last, so they shadow the fixed keys.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut object = Map::new();
        object.insert(
            "error".to_string(),
            self.error.map_or(Value::Bool(false), Value::String),
        );
        object.insert("status".to_string(), Value::from(self.status));
        object.insert(
            "text".to_string(),
            self.text.map_or(Value::Null, Value::String),
        );
        let spread = match &self.data {
            Some(Value::Object(members)) => Some(members.clone()),
            _ => None,
        };
        object.insert("data".to_string(), self.data.unwrap_or(Value::Null));
        if let Some(members) = spread {
            object.extend(members);
        }
        Value::Object(object)
    }
}

/// Shared client used by [`load`].
pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS)).unwrap_or_else(|e| {
            tracing::error!("Failed to build HTTP client: {e}. Falling back to defaults.");
            reqwest::Client::new()
        })
    })
}

pub fn client_with_timeout(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("tosync/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
}

/// Fetch `url` with the shared client.
pub async fn load(url: &str, body: Option<Value>) -> Loaded {
    load_with(http_client(), url, body).await
}

/// Fetch `url` with an explicit client.
pub async fn load_with(client: &reqwest::Client, url: &str, body: Option<Value>) -> Loaded {
    match fetch(client, url, body).await {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::debug!(url, error = %e, "fetch failed");
            Loaded::network_failure(&e)
        }
    }
}

async fn fetch(
    client: &reqwest::Client,
    url: &str,
    body: Option<Value>,
) -> Result<Loaded, FetchError> {
    let request = match body {
        Some(payload) => client.post(url).json(&payload),
        None => client.get(url),
    };
    let response = request.send().await.map_err(FetchError::Request)?;

    let status = response.status();
    let error = (!status.is_success()).then(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    });

    if is_json(response.headers()) {
        let data = match response.json::<Value>().await {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::debug!(url, error = %e, "JSON content-type with unparsable body");
                None
            }
        };
        return Ok(Loaded {
            error,
            status: status.as_u16(),
            data,
            text: None,
        });
    }

    let text = response.text().await.map_err(FetchError::Body)?;
    Ok(Loaded {
        error,
        status: status.as_u16(),
        data: None,
        text: Some(text),
    })
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("application/json"))
}
