//! Request/response model shared by the codec, cache and transport

use bytes::Bytes;
use hyper::{Method, StatusCode, Uri};

/// Header names that describe the content rather than the message
pub const CONTENT_HEADERS: &[&str] = &[
    "Allow",
    "Content-Disposition",
    "Content-Encoding",
    "Content-Language",
    "Content-Length",
    "Content-Location",
    "Content-MD5",
    "Content-Range",
    "Content-Type",
    "Expires",
    "Last-Modified",
];

/// Content-Length header name
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Whether `name` belongs in the content header list
pub fn is_content_header(name: &str) -> bool {
    CONTENT_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Ordered header collection
///
/// Names are matched case-insensitively and keep the spelling of their first
/// insertion. Each name carries an ordered list of values.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    /// Create an empty header collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to `name`, creating the header if needed
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Replace every value of `name` with a single value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1 = vec![value],
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Remove `name`, returning its values
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    /// Values of `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|i| self.entries[i].1.as_slice())
    }

    /// Values of `name` joined the way they travel on the wire
    #[must_use]
    pub fn get_joined(&self, name: &str) -> Option<String> {
        self.get(name).map(|values| values.join(","))
    }

    /// Whether `name` is present
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Number of distinct header names
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no headers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, values)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }
}

/// Names are a set; per name the value sequence must match.
impl PartialEq for Headers {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().all(|(name, values)| {
                other
                    .get(name)
                    .is_some_and(|theirs| values.join(",") == theirs.join(","))
            })
    }
}

impl Eq for Headers {}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// Recorded or outgoing HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Absolute request URI
    pub uri: Uri,
    /// Message headers
    pub headers: Headers,
    /// Content headers, only meaningful when `body` is set
    pub content_headers: Headers,
    /// Request body
    pub body: Option<Bytes>,
}

impl Request {
    /// Create a request without headers or body
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: Headers::new(),
            content_headers: Headers::new(),
            body: None,
        }
    }

    /// Shorthand for a `GET` request
    #[must_use]
    pub fn get(uri: Uri) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Add a header, routing it to the content list when appropriate
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if is_content_header(name) {
            self.content_headers.append(name, value);
        } else {
            self.headers.append(name, value);
        }
        self
    }

    /// Attach a body and keep `Content-Length` consistent with it
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.content_headers
            .set(CONTENT_LENGTH, body.len().to_string());
        self.body = Some(body);
        self
    }
}

/// Recorded or received HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: StatusCode,
    /// Reason phrase as received
    pub reason: String,
    /// Message headers
    pub headers: Headers,
    /// Content headers, only meaningful when `body` is set
    pub content_headers: Headers,
    /// Response body
    pub body: Option<Bytes>,
}

impl Response {
    /// Create a response with the canonical reason phrase for `status`
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers: Headers::new(),
            content_headers: Headers::new(),
            body: None,
        }
    }

    /// Add a header, routing it to the content list when appropriate
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if is_content_header(name) {
            self.content_headers.append(name, value);
        } else {
            self.headers.append(name, value);
        }
        self
    }

    /// Attach a body and keep `Content-Length` consistent with it
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.content_headers
            .set(CONTENT_LENGTH, body.len().to_string());
        self.body = Some(body);
        self
    }

    /// Body bytes, empty when there is no content
    #[must_use]
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }
}
