//! Raster image deduplication by content digest
//!
//! Images are identified by a SHA-256 digest of their raw (still encoded)
//! stream bytes. Byte-identical encoded streams decode identically, so the
//! pixels never need decoding.

use std::collections::HashMap;
use std::fmt;

use lopdf::ObjectId;
use sha2::{Digest, Sha256};

/// Content digest of an image stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDigest([u8; 32]);

impl ImageDigest {
    pub fn of(raw_stream: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(raw_stream);
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for ImageDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// What to do with an image occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageDecision {
    /// First occurrence of this content; the object is now canonical
    Canonical,
    /// The object is the canonical one, seen again
    AlreadyCanonical,
    /// Same content as `canonical`; references must be redirected there
    Duplicate { canonical: ObjectId },
}

/// Index of image digests to their canonical output object
///
/// First registration wins and entries are never evicted during a run.
#[derive(Debug, Default)]
pub struct ImageDeduplicator {
    canonical: HashMap<ImageDigest, ObjectId>,
}

impl ImageDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, digest: &ImageDigest) -> Option<ObjectId> {
        self.canonical.get(digest).copied()
    }

    /// Record `id` as canonical for `digest`; an existing entry is kept
    pub fn register(&mut self, digest: ImageDigest, id: ObjectId) {
        self.canonical.entry(digest).or_insert(id);
    }

    /// Classify the image stored in `id` with the given raw bytes,
    /// registering it when its content is new
    pub fn classify(&mut self, raw_stream: &[u8], id: ObjectId) -> ImageDecision {
        let digest = ImageDigest::of(raw_stream);
        match self.lookup(&digest) {
            Some(canonical) if canonical == id => ImageDecision::AlreadyCanonical,
            Some(canonical) => {
                log::debug!("Image {:?} duplicates {:?} ({})", id, canonical, digest);
                ImageDecision::Duplicate { canonical }
            }
            None => {
                self.register(digest, id);
                ImageDecision::Canonical
            }
        }
    }

    /// Number of distinct images seen
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}
