use serde::{Deserialize, Serialize};

use crate::attribute::Image;
use crate::record::{KeyTuple, Operation};

/// The normalized "item changed" event published for every processed record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// After-side of the diff, pruned to changed branches.
    pub after: Image,
    /// Dotted paths of every changed attribute, in traversal order.
    pub attributes_changed: Vec<String>,
    /// Before-side of the diff, pruned to changed branches.
    pub before: Image,
    #[serde(flatten)]
    pub payload: ImagePayload,
    pub operation: Operation,
    pub pk: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sk: Option<String>,
}

impl ChangeEvent {
    pub fn keys(&self) -> KeyTuple {
        KeyTuple {
            pk: self.pk.clone(),
            sk: self.sk.clone(),
        }
    }

    pub fn is_offloaded(&self) -> bool {
        matches!(self.payload, ImagePayload::Offloaded { .. })
    }
}

/// How the full item images travel with the event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImagePayload {
    /// Images were too large to embed and live in the blob store.
    #[serde(rename_all = "camelCase")]
    Offloaded { images_url: String },
    /// Images are embedded directly in the event.
    #[serde(rename_all = "camelCase")]
    Inline {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_image: Option<Image>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        old_image: Option<Image>,
    },
}

/// Body of an offloaded blob: both full images, whichever are present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_image: Option<Image>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_image: Option<Image>,
}
