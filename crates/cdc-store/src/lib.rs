//! Blob storage for offloaded item images.
//!
//! Change events whose item images are too large to travel inline are written
//! here as JSON documents keyed by event id, and consumers receive a signed,
//! time-limited read reference instead of the images themselves.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsBlobStore`] -- one file per blob plus a `.meta.json` sidecar
//!
//! # Design Rules
//!
//! 1. Keys are flat names. Path separators and relative segments are rejected.
//! 2. Writes overwrite, so retrying a record under the same key is harmless.
//! 3. Every blob carries an expiry. The store collects, callers never delete.
//! 4. Read references are signed by [`UrlSigner`] and bounded in time.

pub mod blob;
pub mod error;
pub mod fs;
pub mod memory;
pub mod signer;
pub mod traits;

pub use blob::{validate_key, BlobMeta, SignedUrl, StoredBlob, DEFAULT_RETENTION, JSON_CONTENT_TYPE};
pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use signer::{UrlSigner, MAX_EXPIRY, MIN_EXPIRY};
pub use traits::BlobStore;
