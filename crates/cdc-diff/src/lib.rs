//! Deep diff engine for the item CDC relay.
//!
//! Compares the before- and after-images of an item attribute by attribute,
//! recursing into nested maps, and produces the ordered list of changed
//! attribute paths together with before/after trees pruned to just the
//! branches that changed.
//!
//! # Key Types
//!
//! - [`ItemDiff`] -- changed paths plus the pruned `before`/`after` trees
//! - [`diff_images`] -- top-level entry point for two optional images
//! - [`diff`] -- the recursive comparison with an explicit path prefix

pub mod error;
pub mod item_diff;

pub use error::{DiffError, DiffResult};
pub use item_diff::{diff, diff_images, ItemDiff, MAX_DEPTH};
