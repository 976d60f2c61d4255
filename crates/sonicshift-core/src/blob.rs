//! In-memory object-URL table.
//!
//! A [`BlobUrl`] is an opaque, revocable reference to a [`Blob`]. Result
//! handles of completed files and temporary download handles both live here,
//! so leaks show up as a non-zero [`BlobStore::len`] after the owning file or
//! download is gone.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// URL scheme prefix for handles issued by [`BlobStore`].
const BLOB_URL_PREFIX: &str = "blob:sonicshift/";

/// Immutable byte payload with a declared media type.
///
/// Cloning is cheap (`Bytes` is reference-counted).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    data: Bytes,
    mime_type: String,
}

impl Blob {
    /// Wrap bytes under the given media type.
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// The payload.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Declared media type.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Revocable reference to a blob held by a [`BlobStore`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobUrl(String);

impl BlobUrl {
    fn generate() -> Self {
        Self(format!("{BLOB_URL_PREFIX}{}", Uuid::new_v4()))
    }

    /// The URL string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Thread-safe table of live blob URLs.
#[derive(Default)]
pub struct BlobStore {
    blobs: Mutex<HashMap<BlobUrl, Blob>>,
}

impl BlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blob and return a fresh URL for it.
    pub fn create(&self, blob: Blob) -> BlobUrl {
        let url = BlobUrl::generate();
        let _ = self.blobs.lock().insert(url.clone(), blob);
        url
    }

    /// Resolve a URL. Returns `None` once the URL has been revoked.
    pub fn get(&self, url: &BlobUrl) -> Option<Blob> {
        self.blobs.lock().get(url).cloned()
    }

    /// Release a URL. Returns `true` if it was live.
    pub fn revoke(&self, url: &BlobUrl) -> bool {
        let revoked = self.blobs.lock().remove(url).is_some();
        if revoked {
            tracing::debug!(url = %url, "blob url revoked");
        }
        revoked
    }

    /// Number of live URLs.
    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    /// Whether no URLs are live.
    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }
}

impl fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStore").field("live", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_get() {
        let store = BlobStore::new();
        let url = store.create(Blob::new(&b"abc"[..], "audio/mp3"));
        let blob = store.get(&url).unwrap();
        assert_eq!(blob.data().as_ref(), b"abc");
        assert_eq!(blob.mime_type(), "audio/mp3");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn urls_are_distinct_and_prefixed() {
        let store = BlobStore::new();
        let a = store.create(Blob::new(Bytes::new(), "audio/wav"));
        let b = store.create(Blob::new(Bytes::new(), "audio/wav"));
        assert_ne!(a, b);
        assert!(a.as_str().starts_with(BLOB_URL_PREFIX));
    }

    #[test]
    fn revoke_releases_once() {
        let store = BlobStore::new();
        let url = store.create(Blob::new(vec![1u8, 2, 3], "audio/ogg"));
        assert!(store.revoke(&url));
        assert!(!store.revoke(&url));
        assert!(store.get(&url).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn blob_len() {
        let blob = Blob::new(vec![0u8; 42], "audio/aac");
        assert_eq!(blob.len(), 42);
        assert!(!blob.is_empty());
        assert!(Blob::new(Bytes::new(), "x").is_empty());
    }
}
