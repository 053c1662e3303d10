//! Foundation types for the item CDC relay.
//!
//! Every other crate in the workspace depends on `cdc-types`.
//!
//! # Key Types
//!
//! - [`StreamEvent`] / [`StreamRecord`] -- raw batch as delivered by the change stream
//! - [`Operation`] -- INSERT, MODIFY or REMOVE
//! - [`KeyTuple`] / [`KeySchema`] -- primary key of the changed item
//! - [`Image`] -- plain nested key-value tree of an item's attributes
//! - [`NormalizedRecord`] -- a record decoded by [`normalize`]
//! - [`ChangeEvent`] / [`ImagePayload`] -- the event published downstream

pub mod attribute;
pub mod error;
pub mod event;
pub mod normalize;
pub mod record;

pub use attribute::{marshall, unmarshall, Image};
pub use error::{TypeError, TypeResult};
pub use event::{ChangeEvent, ImageBundle, ImagePayload};
pub use normalize::{normalize, NormalizedRecord};
pub use record::{KeySchema, KeyTuple, Operation, StreamEvent, StreamPayload, StreamRecord};
