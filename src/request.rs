//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{Extensions, HeaderMap};

use crate::verb::Verb;

/// An incoming HTTP request with its body already collected.
///
/// Middleware steps receive the request by value, may decorate it (route
/// params stay read-only; [`extensions`](Request::extensions_mut) carries
/// request-scoped state such as a parsed body), and pass it forward.
pub struct Request {
    pub(crate) verb: Verb,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) extensions: Extensions,
}

impl Request {
    pub(crate) fn new(verb: Verb, path: String, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            verb,
            path,
            headers,
            body,
            params: HashMap::new(),
            extensions: Extensions::new(),
        }
    }

    pub fn verb(&self) -> Verb { self.verb }
    pub fn path(&self) -> &str { &self.path }

    /// Rewrites the request path. Only observable before route matching,
    /// i.e. from `pre` middleware.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup, with non-UTF-8 values treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Request-scoped typed state, written by middleware and read by handlers.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", "application/json".parse().unwrap());
        Request::new(Verb::Get, "/users/42".to_owned(), headers, Bytes::new())
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = request();
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(req.header("x-missing"), None);
    }

    #[test]
    fn extensions_round_trip_typed_state() {
        #[derive(Clone, PartialEq, Debug)]
        struct Tag(&'static str);

        let mut req = request();
        req.extensions_mut().insert(Tag("alpha"));
        assert_eq!(req.extensions().get::<Tag>(), Some(&Tag("alpha")));
    }
}
