//! HTTP request builder
//!
//! Resources describe a call as method + path + parameters; the builder
//! turns that into an immutable [`PendingRequest`] for the executor.
//! Parameters travel in the query string for `GET`/`DELETE` and as a JSON
//! body for `POST`/`PUT`.

use crate::client::Client;
use crate::error::{Error, Result};
use crate::http::response::RawResponse;
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

/// A fully built API request, ready to be executed (possibly twice when
/// the session has to be renewed).
#[derive(Debug, Clone)]
pub struct PendingRequest {
    method: Method,
    url: Url,
    path: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl PendingRequest {
    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute URL including the encoded query.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// API path below the `api2/json/` prefix, without the query.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Headers set by the caller (credentials are added at execution).
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request body.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Whether the request changes server state and therefore needs the
    /// CSRF prevention token under ticket authentication.
    pub fn is_mutating(&self) -> bool {
        matches!(self.method, Method::POST | Method::PUT | Method::DELETE)
    }
}

/// Builder for API requests.
///
/// Errors from setters (bad header, unserializable parameters) are kept
/// until [`build`](Self::build) or one of the send methods.
#[derive(Debug)]
pub struct RequestBuilder {
    client: Client,
    method: Method,
    path: String,
    url: Result<Url>,
    headers: HeaderMap,
    params: serde_json::Map<String, serde_json::Value>,
    body: Option<Bytes>,
    error: Option<Error>,
}

impl RequestBuilder {
    pub(crate) fn new(client: Client, method: Method, url: Result<Url>, path: String) -> Self {
        Self {
            client,
            method,
            path,
            url,
            headers: HeaderMap::new(),
            params: serde_json::Map::new(),
            body: None,
            error: None,
        }
    }

    /// HTTP method of the request.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Try to set a header, keeping the error for `build` if the name or
    /// value is invalid.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| Error::InvalidRequest(format!("Invalid header name '{key}': {e}")));
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::InvalidRequest(format!("Invalid header value for '{key}': {e}")));

        match (name, value) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (Err(e), _) | (_, Err(e)) => self.fail(e),
        }
        self
    }

    /// Add a single parameter.
    pub fn param(mut self, key: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(serde_json::Value::Null) => {}
            Ok(value) => {
                self.params.insert(key.to_string(), value);
            }
            Err(e) => self.fail(Error::InvalidRequest(format!("parameter '{key}': {e}"))),
        }
        self
    }

    /// Add a parameter only when it is `Some`.
    pub fn param_opt(self, key: &str, value: Option<impl Serialize>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    /// Add every field of a parameter record. `None` fields are skipped.
    pub fn params<P: Serialize + ?Sized>(mut self, params: &P) -> Self {
        match serde_json::to_value(params) {
            Ok(serde_json::Value::Object(fields)) => {
                self.params
                    .extend(fields.into_iter().filter(|(_, v)| !v.is_null()));
            }
            Ok(serde_json::Value::Null) => {}
            Ok(other) => self.fail(Error::InvalidRequest(format!(
                "parameters must serialize to an object, got {other}"
            ))),
            Err(e) => self.fail(Error::InvalidRequest(format!("parameters: {e}"))),
        }
        self
    }

    /// Send `body` verbatim as the JSON request body, bypassing parameter
    /// handling.
    ///
    /// Cannot be combined with [`param`](Self::param) or
    /// [`params`](Self::params); `build` rejects a request that has both.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(e) => self.fail(Error::InvalidRequest(format!("request body: {e}"))),
        }
        self
    }

    fn fail(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Assemble the request.
    ///
    /// # Errors
    ///
    /// The first error recorded by a setter, or [`Error::InvalidUrl`] if the
    /// path could not be joined to the base URL.
    pub fn build(self) -> Result<PendingRequest> {
        let (request, _) = self.into_parts()?;
        Ok(request)
    }

    fn into_parts(mut self) -> Result<(PendingRequest, Client)> {
        if self.body.is_some() && !self.params.is_empty() {
            let keys: Vec<&str> = self.params.keys().map(String::as_str).collect();
            let error = Error::InvalidRequest(format!(
                "{} {}: explicit JSON body cannot be combined with parameters ({})",
                self.method,
                self.path,
                keys.join(", ")
            ));
            self.fail(error);
        }
        if let Some(error) = self.error {
            return Err(error);
        }
        let mut url = self.url?;
        let mut headers = self.headers;
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut body = self.body;
        if body.is_none() && !self.params.is_empty() {
            if matches!(self.method, Method::POST | Method::PUT) {
                let bytes = serde_json::to_vec(&self.params)
                    .map_err(|e| Error::InvalidRequest(format!("request body: {e}")))?;
                body = Some(Bytes::from(bytes));
            } else {
                append_query(&mut url, &self.params);
            }
        }
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let request = PendingRequest {
            method: self.method,
            url,
            path: self.path,
            headers,
            body,
        };
        Ok((request, self.client))
    }

    /// Execute the request and return the raw response, whatever its status.
    pub async fn execute(self) -> Result<RawResponse> {
        let (request, client) = self.into_parts()?;
        client.execute(&request).await
    }

    /// Execute the request, classify non-2xx responses, and decode the
    /// `data` payload into `T`.
    pub async fn send<T: DeserializeOwned>(self) -> Result<T> {
        self.execute().await?.error_for_status()?.decode_data()
    }

    /// Execute the request and return the body verbatim.
    pub async fn send_raw(self) -> Result<Bytes> {
        Ok(self.execute().await?.error_for_status()?.into_bytes())
    }
}

fn append_query(url: &mut Url, params: &serde_json::Map<String, serde_json::Value>) {
    let mut pairs = url.query_pairs_mut();
    for (key, value) in params {
        match value {
            serde_json::Value::Array(items) => {
                for item in items {
                    pairs.append_pair(key, &query_value(item));
                }
            }
            other => {
                pairs.append_pair(key, &query_value(other));
            }
        }
    }
}

fn query_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        other => other.to_string(),
    }
}
