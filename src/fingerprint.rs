//! Cache keys derived from requests

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::exchange::{Headers, Request};

/// Cache key for a request
///
/// Two fingerprints are equal when URI, method, message headers and content
/// headers all match. The body is carried along for persistence but never
/// compared. The hash covers the URI only; equality breaks ties.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    request: Arc<Request>,
}

impl Fingerprint {
    /// Fingerprint a request
    #[must_use]
    pub fn new(request: Request) -> Self {
        Self {
            request: Arc::new(request),
        }
    }

    /// The request this fingerprint was taken from
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Stable SHA-256 over the compared fields, for log correlation
    ///
    /// Header names are lowercased and sorted so the digest agrees with
    /// equality.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();

        let method = self.request.method.as_str();
        hasher.update((method.len() as u32).to_le_bytes());
        hasher.update(method.as_bytes());

        let uri = self.request.uri.to_string();
        hasher.update((uri.len() as u32).to_le_bytes());
        hasher.update(uri.as_bytes());

        digest_headers(&mut hasher, &self.request.headers);
        digest_headers(&mut hasher, &self.request.content_headers);

        hasher.finalize().into()
    }

    /// First eight bytes of [`Self::digest`] in hex
    #[must_use]
    pub fn short_id(&self) -> String {
        hex::encode(&self.digest()[..8])
    }
}

fn digest_headers(hasher: &mut Sha256, headers: &Headers) {
    let mut sorted: Vec<(String, String)> = headers
        .iter()
        .map(|(name, values)| (name.to_ascii_lowercase(), values.join(",")))
        .collect();
    sorted.sort();

    hasher.update((sorted.len() as u32).to_le_bytes());
    for (name, value) in &sorted {
        hasher.update((name.len() as u32).to_le_bytes());
        hasher.update(name.as_bytes());
        hasher.update((value.len() as u32).to_le_bytes());
        hasher.update(value.as_bytes());
    }
}

impl From<Request> for Fingerprint {
    fn from(request: Request) -> Self {
        Self::new(request)
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (&*self.request, &*other.request);
        a.uri == b.uri
            && a.method == b.method
            && a.headers == b.headers
            && a.content_headers == b.content_headers
    }
}

impl Eq for Fingerprint {}

impl Hash for Fingerprint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.request.uri.hash(state);
    }
}
