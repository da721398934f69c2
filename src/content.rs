//! Content negotiation: symbolic content types, outgoing header construction,
//! request-body encoding, and response-body decoding.
//!
//! Decoding is deliberately forgiving: a response whose declared content type
//! is absent or unrecognized is tried as JSON first and degrades to text on
//! failure. That degradation is logged, never surfaced — a best-effort textual
//! body is more useful to a caller than a hard failure on an already
//! successful transport round trip.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{trace, warn};

use crate::{Error, Result};

/// Symbolic content-type names and their MIME strings.
///
/// The table is fixed for the lifetime of the client; it drives both the
/// outgoing `Content-Type` header and the encoding of structured bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Text,
    Html,
    Xml,
    Form,
    Multipart,
    Binary,
}

impl ContentType {
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Text => "text/plain",
            ContentType::Html => "text/html",
            ContentType::Xml => "application/xml",
            ContentType::Form => "application/x-www-form-urlencoded",
            ContentType::Multipart => "multipart/form-data",
            ContentType::Binary => "application/octet-stream",
        }
    }
}

/// A request body as supplied by the caller, before negotiation.
#[derive(Debug)]
pub enum RequestBody {
    /// Structured value; encoded according to the negotiated content type.
    Json(serde_json::Value),
    /// Pre-encoded text payload, passed through unchanged.
    Text(String),
    /// Pre-encoded binary payload, passed through unchanged.
    Binary(Bytes),
    /// Multipart form; passed to the transport unchanged so it can supply
    /// its own boundary parameter.
    Multipart(reqwest::multipart::Form),
}

impl RequestBody {
    pub fn is_multipart(&self) -> bool {
        matches!(self, RequestBody::Multipart(_))
    }
}

/// A request body after negotiation, ready for the transport.
#[derive(Debug)]
pub(crate) enum EncodedBody {
    Empty,
    Text(String),
    Bytes(Bytes),
    Multipart(reqwest::multipart::Form),
}

/// A fully decoded response body, as handed back to callers and as stored in
/// the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
    Binary(Vec<u8>),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Deserialize a JSON body into a typed value.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        match self {
            ResponseBody::Json(value) => Ok(serde_json::from_value(value.clone())?),
            ResponseBody::Text(text) => Ok(serde_json::from_str(text)?),
            ResponseBody::Binary(bytes) => Ok(serde_json::from_slice(bytes)?),
        }
    }
}

/// Build the outgoing header map.
///
/// The symbolic content type sets `Content-Type`, explicit headers overlay it
/// (explicit wins), and a multipart body forces the header's removal so the
/// transport can attach its own boundary. The removal is a required override,
/// not an optional one, so it also wins over an explicit header.
pub(crate) fn build_headers(
    content: Option<ContentType>,
    explicit: &HashMap<String, String>,
    multipart: bool,
) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Some(content) = content {
        if let Ok(value) = HeaderValue::from_str(content.mime()) {
            headers.insert(CONTENT_TYPE, value);
        }
    }

    for (name, value) in explicit {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => {
                warn!(header = %name, "skipping malformed explicit header");
            }
        }
    }

    if multipart {
        headers.remove(CONTENT_TYPE);
    }

    headers
}

/// Encode the caller's body according to the negotiated content type.
///
/// Multipart passes through; a structured value is serialized as JSON or
/// flattened to form-urlencoded pairs; every other combination passes through
/// unchanged (the caller is responsible for pre-encoding).
pub(crate) fn encode_body(
    body: Option<RequestBody>,
    content: Option<ContentType>,
) -> Result<EncodedBody> {
    let Some(body) = body else {
        return Ok(EncodedBody::Empty);
    };

    match body {
        RequestBody::Multipart(form) => Ok(EncodedBody::Multipart(form)),
        RequestBody::Json(value) => match content {
            Some(ContentType::Form) => Ok(EncodedBody::Text(encode_form(&value))),
            // JSON is the default encoding for a structured body.
            _ => Ok(EncodedBody::Text(serde_json::to_string(&value)?)),
        },
        RequestBody::Text(text) => Ok(EncodedBody::Text(text)),
        RequestBody::Binary(bytes) => Ok(EncodedBody::Bytes(bytes)),
    }
}

/// Flatten a structured value into `key=value` pairs.
fn encode_form(value: &serde_json::Value) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    if let Some(object) = value.as_object() {
        for (key, value) in object {
            match value {
                serde_json::Value::String(s) => {
                    serializer.append_pair(key, s);
                }
                other => {
                    serializer.append_pair(key, &other.to_string());
                }
            }
        }
    }
    serializer.finish()
}

/// Decode a response body by its declared content type.
///
/// Infallible: an absent or unrecognized type is tried as JSON and degrades
/// to lossy text. Declared-JSON that fails to parse degrades the same way.
pub(crate) fn decode_bytes(content_type: Option<&str>, bytes: &[u8]) -> ResponseBody {
    let declared = content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase());

    match declared.as_deref() {
        Some("application/json") => match serde_json::from_slice(bytes) {
            Ok(value) => ResponseBody::Json(value),
            Err(err) => {
                warn!(%err, "declared JSON body failed to parse, degrading to text");
                ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        },
        Some(ct) if ct.starts_with("text/") => {
            ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned())
        }
        Some("application/octet-stream") => ResponseBody::Binary(bytes.to_vec()),
        _ => match serde_json::from_slice(bytes) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => {
                trace!("undeclared content type did not parse as JSON, degrading to text");
                ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        },
    }
}

/// Read and decode a full response. Only the body read itself can fail (a
/// transport-level error); decoding never does.
pub(crate) async fn decode_response(response: reqwest::Response) -> Result<ResponseBody> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let bytes = response.bytes().await.map_err(Error::from_transport)?;
    Ok(decode_bytes(content_type.as_deref(), &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_type_table() {
        assert_eq!(ContentType::Json.mime(), "application/json");
        assert_eq!(ContentType::Form.mime(), "application/x-www-form-urlencoded");
        assert_eq!(ContentType::Multipart.mime(), "multipart/form-data");
        assert_eq!(ContentType::Binary.mime(), "application/octet-stream");
    }

    #[test]
    fn symbolic_content_sets_header() {
        let headers = build_headers(Some(ContentType::Json), &HashMap::new(), false);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn explicit_headers_win_over_symbolic_default() {
        let mut explicit = HashMap::new();
        explicit.insert("content-type".to_string(), "application/xml".to_string());
        let headers = build_headers(Some(ContentType::Json), &explicit, false);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/xml");
    }

    #[test]
    fn multipart_removes_content_type_even_when_explicit() {
        let mut explicit = HashMap::new();
        explicit.insert("content-type".to_string(), "multipart/form-data".to_string());
        let headers = build_headers(Some(ContentType::Multipart), &explicit, true);
        assert!(headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn structured_body_serializes_as_json_by_default() {
        let encoded = encode_body(Some(RequestBody::Json(json!({"a": 1}))), None).unwrap();
        match encoded {
            EncodedBody::Text(text) => assert_eq!(text, r#"{"a":1}"#),
            other => panic!("unexpected encoding: {other:?}"),
        }
    }

    #[test]
    fn structured_body_flattens_to_form_pairs() {
        let body = RequestBody::Json(json!({"name": "ada", "page": 2}));
        let encoded = encode_body(Some(body), Some(ContentType::Form)).unwrap();
        match encoded {
            EncodedBody::Text(text) => {
                assert!(text.contains("name=ada"));
                assert!(text.contains("page=2"));
            }
            other => panic!("unexpected encoding: {other:?}"),
        }
    }

    #[test]
    fn pre_encoded_text_passes_through() {
        let encoded =
            encode_body(Some(RequestBody::Text("<p>hi</p>".into())), Some(ContentType::Html))
                .unwrap();
        match encoded {
            EncodedBody::Text(text) => assert_eq!(text, "<p>hi</p>"),
            other => panic!("unexpected encoding: {other:?}"),
        }
    }

    #[test]
    fn decode_declared_json() {
        let body = decode_bytes(Some("application/json; charset=utf-8"), br#"{"ok":true}"#);
        assert_eq!(body, ResponseBody::Json(json!({"ok": true})));
    }

    #[test]
    fn decode_declared_text() {
        let body = decode_bytes(Some("text/html"), b"<html></html>");
        assert_eq!(body, ResponseBody::Text("<html></html>".into()));
    }

    #[test]
    fn decode_octet_stream_is_opaque() {
        let body = decode_bytes(Some("application/octet-stream"), &[0, 159, 146, 150]);
        assert_eq!(body, ResponseBody::Binary(vec![0, 159, 146, 150]));
    }

    #[test]
    fn undeclared_type_tries_json_first() {
        let body = decode_bytes(None, br#"[1,2,3]"#);
        assert_eq!(body, ResponseBody::Json(json!([1, 2, 3])));
    }

    #[test]
    fn undeclared_type_degrades_to_text_without_error() {
        let body = decode_bytes(None, b"not json at all");
        assert_eq!(body, ResponseBody::Text("not json at all".into()));
    }

    #[test]
    fn invalid_utf8_degrades_to_lossy_text() {
        let body = decode_bytes(Some("weird/type"), &[0xff, 0xfe, b'h', b'i']);
        match body {
            ResponseBody::Text(text) => assert!(text.ends_with("hi")),
            other => panic!("unexpected decode: {other:?}"),
        }
    }
}
