//! Request identity and cache key generation.

use sha2::{Digest, Sha256};
use url::Url;

/// Canonical form of a request URL used as its identity: the fragment is dropped.
pub fn identity_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

/// Compute the entry key for a request identity.
pub fn compute_cache_key(method: &str, url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(identity_url(url).as_bytes());
    hex::encode(hasher.finalize())
}
