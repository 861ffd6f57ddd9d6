//! Transport responses and their cacheable projections.
//!
//! - [`TransportResponse`] - What the transport hands back: status, headers, raw body
//! - [`ProjectedResponse`] - The serialization-safe shape that is cached and returned
//! - [`Projected`] - Either a full [`ProjectedResponse`] or a value extracted from it
//!
//! Only projections are ever persisted. The transport response never leaves
//! the call that produced it.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::request::RequestDescriptor;

/// Raw response returned by the transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TransportResponse {
    /// Creates a response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON, when the content type says so and it parses.
    pub fn json(&self) -> Option<Value> {
        let is_json = self
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("json"));
        if !is_json || self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// Body-less `http::Response` view used by the cache policy primitive.
    pub fn to_http(&self) -> Response<()> {
        let mut response = Response::new(());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response
    }
}

/// The request part embedded in a [`ProjectedResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    /// Request method.
    #[serde(with = "http_serde::method")]
    pub method: Method,
    /// Full request URL.
    pub url: String,
    /// Request headers.
    #[serde(with = "http_serde::header_map")]
    pub headers: HeaderMap,
}

impl From<&RequestDescriptor> for RequestSnapshot {
    fn from(request: &RequestDescriptor) -> Self {
        Self {
            method: request.method().clone(),
            url: request.uri().to_string(),
            headers: request.headers().clone(),
        }
    }
}

/// Default projection of a transport response.
///
/// `header` also answers to `headers`, and `status` to `statusCode`, when a
/// single field is extracted with [`ProjectedResponse::field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedResponse {
    /// The request that produced the response.
    pub req: RequestSnapshot,
    /// Parsed JSON body, `null` for non-JSON or empty bodies.
    pub body: Value,
    /// Body as text, absent for empty bodies.
    pub text: Option<String>,
    /// Response headers.
    #[serde(with = "http_serde::header_map", alias = "headers")]
    pub header: HeaderMap,
    /// Response status.
    #[serde(with = "http_serde::status_code", alias = "statusCode")]
    pub status: StatusCode,
    /// Whether the status is 2xx.
    pub ok: bool,
}

impl ProjectedResponse {
    /// Projects `response`, received for `request`.
    pub fn new(request: &RequestDescriptor, response: &TransportResponse) -> Self {
        let text = (!response.body().is_empty()).then(|| response.text());
        Self {
            req: request.into(),
            body: response.json().unwrap_or(Value::Null),
            text,
            header: response.headers().clone(),
            status: response.status(),
            ok: response.status().is_success(),
        }
    }

    /// Result of an `only-if-cached` call that found nothing: status 504,
    /// no headers, no body.
    pub fn gateway_timeout(request: &RequestDescriptor) -> Self {
        Self {
            req: request.into(),
            body: Value::Null,
            text: None,
            header: HeaderMap::new(),
            status: StatusCode::GATEWAY_TIMEOUT,
            ok: false,
        }
    }

    /// Extracts a single named field, `null` when there is no such field.
    pub fn field(&self, name: &str) -> Value {
        match name {
            "req" => json_request(&self.req),
            "body" => self.body.clone(),
            "text" => self.text.clone().map(Value::String).unwrap_or(Value::Null),
            "header" | "headers" => json_headers(&self.header),
            "status" | "statusCode" => Value::from(self.status.as_u16()),
            "ok" => Value::Bool(self.ok),
            _ => Value::Null,
        }
    }
}

fn json_headers(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        map.insert(name.as_str().to_owned(), Value::String(joined));
    }
    Value::Object(map)
}

fn json_request(req: &RequestSnapshot) -> Value {
    serde_json::json!({
        "method": req.method.as_str(),
        "url": req.url,
        "headers": json_headers(&req.headers),
    })
}

/// Value cached and handed back for a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projected {
    /// The default projection.
    Response(ProjectedResponse),
    /// Output of a prune function or a single extracted field.
    Value(Value),
}

impl Projected {
    /// Whether the value counts as empty: `false`, `null` or an object
    /// without keys. A full response projection is never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Projected::Response(_) => false,
            Projected::Value(Value::Null) | Projected::Value(Value::Bool(false)) => true,
            Projected::Value(Value::Object(map)) => map.is_empty(),
            Projected::Value(_) => false,
        }
    }

    /// The full projection, if this is one.
    pub fn as_response(&self) -> Option<&ProjectedResponse> {
        match self {
            Projected::Response(response) => Some(response),
            Projected::Value(_) => None,
        }
    }

    /// The extracted value, if this is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Projected::Response(_) => None,
            Projected::Value(value) => Some(value),
        }
    }

    /// Response status, if the projection still carries one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Projected::Response(response) => Some(response.status),
            Projected::Value(value) => value
                .as_object()
                .and_then(|object| object.get("status").or_else(|| object.get("statusCode")))
                .and_then(Value::as_u64)
                .and_then(|code| u16::try_from(code).ok())
                .and_then(|code| StatusCode::from_u16(code).ok()),
        }
    }

    /// Sets a response header.
    ///
    /// Extracted values only receive it when they are objects with a
    /// `header` or `headers` object.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        match self {
            Projected::Response(response) => {
                response.header.insert(name, value);
            }
            Projected::Value(value_obj) => {
                for headers in value_headers_mut(value_obj) {
                    let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                    headers.insert(name.as_str().to_owned(), Value::String(value));
                }
            }
        }
    }

    /// Replaces the response headers.
    ///
    /// Extracted values only receive them in an existing `header` or
    /// `headers` object.
    pub fn replace_headers(&mut self, headers: &HeaderMap) {
        match self {
            Projected::Response(response) => response.header = headers.clone(),
            Projected::Value(value) => {
                let Value::Object(replacement) = json_headers(headers) else {
                    return;
                };
                for target in value_headers_mut(value) {
                    *target = replacement.clone();
                }
            }
        }
    }

    /// Copies each of `names` from `source` onto the response headers and the
    /// embedded request headers. A name absent from `source` is removed.
    pub fn copy_headers_from(&mut self, names: &[HeaderName], source: &HeaderMap) {
        if names.is_empty() {
            return;
        }
        match self {
            Projected::Response(response) => {
                for name in names {
                    copy_header(&mut response.header, name, source);
                    copy_header(&mut response.req.headers, name, source);
                }
            }
            Projected::Value(value) => {
                for headers in value_headers_mut(value) {
                    for name in names {
                        match source.get(name) {
                            Some(found) => {
                                let found = String::from_utf8_lossy(found.as_bytes()).into_owned();
                                headers.insert(name.as_str().to_owned(), Value::String(found));
                            }
                            None => {
                                headers.remove(name.as_str());
                            }
                        }
                    }
                }
            }
        }
    }
}

fn copy_header(target: &mut HeaderMap, name: &HeaderName, source: &HeaderMap) {
    target.remove(name);
    for value in source.get_all(name) {
        target.append(name.clone(), value.clone());
    }
}

fn value_headers_mut(value: &mut Value) -> impl Iterator<Item = &mut Map<String, Value>> {
    value
        .as_object_mut()
        .into_iter()
        .flat_map(|object| object.iter_mut())
        .filter(|(key, _)| key.as_str() == "header" || key.as_str() == "headers")
        .filter_map(|(_, headers)| headers.as_object_mut())
}
