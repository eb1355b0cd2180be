//! Body-parsing middleware.
//!
//! The parser decodes a request's payload into a structured
//! [`serde_json::Value`] attached to the request's extensions, with a fixed
//! policy:
//!
//! - no maximum body size (the deployment's proxy owns that limit)
//! - parsed values never merge into route params, and an already-present
//!   parsed body is never overridden
//! - multi-valued form fields are preserved as JSON arrays
//! - a SHA-256 digest of the raw bytes is attached alongside the value
//!
//! Supported content types: `application/json` and
//! `application/x-www-form-urlencoded`. Anything else passes through
//! untouched (the raw bytes stay available via
//! [`Request::body`](crate::Request::body)); a payload that fails to parse
//! short-circuits with `400 Bad Request`.

use http::StatusCode;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::handler::{BoxedStep, Flow, Middleware};
use crate::request::Request;
use crate::response::Response;

/// The structured body a parser step attached to the request.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedBody(pub Value);

/// Lowercase hex SHA-256 digest of the raw request body.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyDigest(pub String);

impl Request {
    /// The structured body, if a body-parser step ran ahead of this handler.
    pub fn parsed_body(&self) -> Option<&Value> {
        self.extensions.get::<ParsedBody>().map(|b| &b.0)
    }

    /// The raw-body digest, if a body-parser step ran ahead of this handler.
    pub fn body_digest(&self) -> Option<&str> {
        self.extensions.get::<BodyDigest>().map(|d| d.0.as_str())
    }
}

/// Builds the parser as an installable middleware step.
pub(crate) fn parser_step() -> BoxedStep {
    Middleware::into_step(|req: Request| async move { parse(req) })
}

fn parse(mut req: Request) -> Flow {
    if req.body().is_empty() || req.extensions.get::<ParsedBody>().is_some() {
        return Flow::Forward(req);
    }

    let content_type = req
        .header("content-type")
        .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .unwrap_or_default();

    let parsed = match content_type.as_str() {
        "application/json" => serde_json::from_slice::<Value>(req.body()).ok(),
        "application/x-www-form-urlencoded" => Some(parse_form(req.body())),
        _ => return Flow::Forward(req),
    };

    let Some(value) = parsed else {
        return Flow::Respond(Response::status(StatusCode::BAD_REQUEST));
    };

    let digest = hex::encode(Sha256::digest(req.body()));
    req.extensions_mut().insert(ParsedBody(value));
    req.extensions_mut().insert(BodyDigest(digest));
    Flow::Forward(req)
}

/// Decodes `application/x-www-form-urlencoded` bytes, keeping repeated
/// fields as arrays rather than last-one-wins.
fn parse_form(body: &[u8]) -> Value {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        let value = Value::String(value.into_owned());
        match map.entry(key.into_owned()) {
            serde_json::map::Entry::Vacant(slot) => {
                slot.insert(value);
            }
            serde_json::map::Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Array(values) => values.push(value),
                existing => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            },
        }
    }
    Value::Object(map)
}
