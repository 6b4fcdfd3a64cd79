//! Completed responses.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::io;

/// A response received in full: status, headers and the body read until the peer closed.
///
/// Only ever handed out for a successful request.
#[derive(Debug, Clone, Default)]
pub struct Response {
    status_code: u16,
    status_message: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Response {
    pub(crate) fn new(
        status_code: u16,
        status_message: String,
        headers: HashMap<String, String>,
        body: Vec<u8>,
    ) -> Self {
        Response {
            status_code,
            status_message,
            headers,
            body,
        }
    }

    /// The numeric status code, i.e. `200` in `HTTP/1.1 200 OK`.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// The status text after the code, i.e. `OK` in `HTTP/1.1 200 OK`.
    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Response headers, name to value, exactly as sent. For a name sent more than
    /// once, the last value wins.
    ///
    /// Values are everything after the colon, so they typically start with a space.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Get a header value by its name as sent. The lookup is case sensitive.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }

    /// The headers as an `http::HeaderMap`, for case insensitive lookups.
    ///
    /// Names and values that aren't valid in HTTP are left out, as are surrounding spaces
    /// of values. Names only differing in case collapse to one entry.
    pub fn header_map(&self) -> HeaderMap {
        let mut names: Vec<_> = self.headers.keys().collect();
        // deterministic pick among names differing in case.
        names.sort();

        let mut map = HeaderMap::with_capacity(names.len());

        for name in names {
            let value = self.headers[name].trim();

            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(n), Ok(v)) => {
                    map.insert(n, v);
                }
                _ => trace!("Header not valid in HeaderMap: {:?}", name),
            }
        }

        map
    }

    /// The body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// A reader over the body bytes.
    pub fn body_reader(&self) -> io::Cursor<&[u8]> {
        io::Cursor::new(&self.body[..])
    }

    /// Take the body out of the response.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}
