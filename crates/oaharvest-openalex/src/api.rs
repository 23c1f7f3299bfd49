//! OpenAlex REST API client

use std::time::Duration;

use serde_json::Value;

use oaharvest_core::{DEFAULT_TIMEOUT, FetchError, get_json};

/// Public OpenAlex API
pub const DEFAULT_BASE_URL: &str = "https://api.openalex.org";

/// Where records come from. Implemented over HTTP by [`OpenAlexClient`];
/// tests substitute canned responses.
pub trait RecordSource: Sync {
    /// Author candidates whose display name matches `name`
    fn search_authors(&self, name: &str) -> Result<Vec<Value>, FetchError>;

    /// Works returned by a caller-supplied listing URL
    fn list_works(&self, url: &str) -> Result<Vec<Value>, FetchError>;
}

/// Blocking OpenAlex client; one request per call, no retries.
#[derive(Debug, Clone)]
pub struct OpenAlexClient {
    base_url: String,
    mailto: Option<String>,
    timeout: Duration,
}

impl OpenAlexClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            mailto: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Identify ourselves for OpenAlex's polite pool
    pub fn with_mailto(mut self, mailto: Option<String>) -> Self {
        self.mailto = mailto.filter(|m| !m.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn get_results(&self, url: &str, query: &[(&str, &str)]) -> Result<Vec<Value>, FetchError> {
        let mut query = query.to_vec();
        // Listing URLs may already carry their own mailto
        if let Some(mailto) = &self.mailto {
            if !url.contains("mailto=") {
                query.push(("mailto", mailto.as_str()));
            }
        }
        let body = get_json(url, &query, self.timeout)?;
        results(body)
    }
}

impl Default for OpenAlexClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl RecordSource for OpenAlexClient {
    fn search_authors(&self, name: &str) -> Result<Vec<Value>, FetchError> {
        let url = format!("{}/authors", self.base_url);
        let filter = format!("display_name.search:{name}");
        self.get_results(&url, &[("filter", filter.as_str())])
    }

    fn list_works(&self, url: &str) -> Result<Vec<Value>, FetchError> {
        self.get_results(url, &[])
    }
}

/// Extract the `results` list from a response body
fn results(body: Value) -> Result<Vec<Value>, FetchError> {
    match body {
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(FetchError::Decode("'results' is not a list".into())),
            None => Err(FetchError::Decode("no 'results' in response".into())),
        },
        _ => Err(FetchError::Decode("response is not an object".into())),
    }
}
