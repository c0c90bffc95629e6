//! Raw API responses and decoding
//!
//! The executor hands back a [`RawResponse`] for every status code. Turning
//! it into a typed value or a typed error happens here.

use crate::error::{Error, Result};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use turbopve_transport::HttpResponse;

/// A complete HTTP response with the body held in memory.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    elapsed: Duration,
    attempts: u32,
}

impl RawResponse {
    /// Create a response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            elapsed: Duration::ZERO,
            attempts: 1,
        }
    }

    /// HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body bytes, verbatim.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Consume the response and return the body, verbatim.
    pub fn into_bytes(self) -> Bytes {
        self.body
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Wall time of the final transport attempt.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Physical transport attempts behind this response.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Check if response is successful (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the response declares a JSON content type.
    pub fn is_json(&self) -> bool {
        self.header("content-type")
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
    }

    /// Decode the body as JSON.
    ///
    /// Returns `Ok(None)` without looking at the body when it is empty, the
    /// status is 204, or the content type is not JSON.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] carrying the raw body when the JSON does not match
    /// `T`.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        if self.body.is_empty() || self.status == StatusCode::NO_CONTENT || !self.is_json() {
            return Ok(None);
        }

        serde_json::from_slice(&self.body)
            .map(Some)
            .map_err(|e| self.decode_error(e))
    }

    /// Decode the payload of the `{"data": ...}` envelope.
    ///
    /// A response without an envelope (or without a JSON body at all) is
    /// treated as `data: null`, so `()`, `Option<_>` and
    /// `serde_json::Value` targets still succeed.
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self
            .decode_json::<DataEnvelope>()?
            .map(|envelope| envelope.data)
            .unwrap_or(serde_json::Value::Null);

        serde_json::from_value(data).map_err(|e| self.decode_error(e))
    }

    /// Return the response unchanged for 2xx, otherwise the classified error.
    pub fn error_for_status(self) -> Result<Self> {
        match classify_error(&self) {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    fn decode_error(&self, err: serde_json::Error) -> Error {
        Error::Decode {
            message: err.to_string(),
            body: self.text(),
        }
    }
}

impl From<HttpResponse> for RawResponse {
    fn from(response: HttpResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
            elapsed: response.elapsed,
            attempts: response.attempts,
        }
    }
}

/// Classify a response: `None` for 2xx, otherwise an [`Error::Api`].
pub fn classify_error(response: &RawResponse) -> Option<Error> {
    if response.is_success() {
        return None;
    }
    Some(Error::from_response(response.status, &response.body))
}

#[derive(serde::Deserialize)]
struct DataEnvelope {
    #[serde(default)]
    data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn json_response(status: u16, body: &str) -> RawResponse {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/json;charset=UTF-8"),
        );
        RawResponse::new(StatusCode::from_u16(status).unwrap(), headers, body.to_string())
    }

    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Version {
        version: String,
        release: String,
    }

    #[test]
    fn test_decode_data_unwraps_envelope() {
        let response = json_response(
            200,
            r#"{"data":{"version":"8.2.4","release":"8.2","repoid":"faa83925"}}"#,
        );
        let version: Version = response.decode_data().unwrap();
        assert_eq!(
            version,
            Version {
                version: "8.2.4".into(),
                release: "8.2".into()
            }
        );
    }

    #[test]
    fn test_decode_data_scalar_and_null() {
        let upid: String = json_response(200, r#"{"data":"UPID:pve1:0001:02:03:qmstart:100:root@pam:"}"#)
            .decode_data()
            .unwrap();
        assert!(upid.starts_with("UPID:pve1"));

        json_response(200, r#"{"data":null}"#)
            .decode_data::<()>()
            .unwrap();

        let missing: Option<String> = json_response(200, "{}").decode_data().unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_decode_skips_non_json() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        let response = RawResponse::new(StatusCode::OK, headers, "{\"data\":1}");

        assert!(!response.is_json());
        assert_eq!(response.decode_json::<serde_json::Value>().unwrap(), None);
        assert_eq!(response.bytes().as_ref(), b"{\"data\":1}");
    }

    #[test]
    fn test_decode_skips_empty_and_no_content() {
        let empty = json_response(200, "");
        assert_eq!(empty.decode_json::<serde_json::Value>().unwrap(), None);

        let no_content = json_response(204, "{\"data\":1}");
        assert_eq!(no_content.decode_json::<serde_json::Value>().unwrap(), None);
    }

    #[test]
    fn test_decode_error_carries_body() {
        let response = json_response(200, r#"{"data":{"version":5}}"#);
        match response.decode_data::<Version>() {
            Err(Error::Decode { body, .. }) => assert_eq!(body, r#"{"data":{"version":5}}"#),
            other => panic!("Expected Decode error, got {other:?}"),
        }

        let malformed = json_response(200, "{\"data\":");
        assert!(matches!(
            malformed.decode_json::<serde_json::Value>(),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn test_decode_data_requires_payload_for_non_optional_targets() {
        let response = json_response(200, r#"{"data":null}"#);
        assert!(matches!(
            response.decode_data::<Vec<String>>(),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn test_classify_error() {
        assert!(classify_error(&json_response(200, "{}")).is_none());

        let err = classify_error(&json_response(400, r#"{"errors":["field X is required"]}"#))
            .unwrap();
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(err.messages(), &["field X is required".to_string()]);

        let err = json_response(500, "not json").error_for_status().unwrap_err();
        match err {
            Error::Api {
                status,
                messages,
                body,
            } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert!(messages.is_empty());
                assert_eq!(body, "not json");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }
}
