use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{TypeError, TypeResult};

/// A batch of change notifications as delivered by the upstream stream.
///
/// Records stay undecoded here. Each one goes through
/// [`StreamRecord::decode`] on its own, so a record with a badly shaped
/// field fails alone instead of rejecting the whole batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<Value>,
}

impl StreamEvent {
    /// Wrap already-typed records, e.g. for tests and tooling.
    pub fn from_records(records: impl IntoIterator<Item = StreamRecord>) -> TypeResult<Self> {
        let records = records
            .into_iter()
            .map(|r| serde_json::to_value(r).map_err(|e| TypeError::UndecodableRecord(e.to_string())))
            .collect::<TypeResult<_>>()?;
        Ok(Self { records })
    }
}

/// One change notification for a single item.
///
/// Every field is optional at the parse layer. A record that lacks one of
/// the mandatory fields is skipped rather than rejected, so the shape check
/// lives in [`StreamRecord::missing_field`] instead of in serde.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    #[serde(rename = "eventID", default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    #[serde(rename = "eventName", default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamodb: Option<StreamPayload>,
}

impl StreamRecord {
    /// Decode one raw record.
    ///
    /// Absent fields decode to `None`. A field of the wrong JSON shape, such
    /// as a list where an image map belongs, is an error.
    pub fn decode(raw: Value) -> TypeResult<Self> {
        serde_json::from_value(raw).map_err(|e| TypeError::UndecodableRecord(e.to_string()))
    }

    /// Best-effort event id of a raw record that may not decode.
    pub fn raw_event_id(raw: &Value) -> Option<String> {
        raw.get("eventID").and_then(Value::as_str).map(str::to_string)
    }

    /// Name of the first mandatory field that is absent, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.event_name.is_none() {
            Some("eventName")
        } else if self.event_id.is_none() {
            Some("eventID")
        } else if self.dynamodb.is_none() {
            Some("dynamodb")
        } else {
            None
        }
    }

    /// The event identifier, or `"<none>"` for logging purposes.
    pub fn display_id(&self) -> &str {
        self.event_id.as_deref().unwrap_or("<none>")
    }
}

/// The change-data payload of a stream record: keys, typed images, size.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamPayload {
    #[serde(rename = "Keys", default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Map<String, Value>>,

    #[serde(rename = "NewImage", default, skip_serializing_if = "Option::is_none")]
    pub new_image: Option<Map<String, Value>>,

    #[serde(rename = "OldImage", default, skip_serializing_if = "Option::is_none")]
    pub old_image: Option<Map<String, Value>>,

    #[serde(rename = "SizeBytes", default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// The kind of mutation a record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Insert,
    Modify,
    Remove,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Modify => "MODIFY",
            Self::Remove => "REMOVE",
        }
    }

    /// Whether records of this kind carry a before-image.
    pub fn has_old_image(&self) -> bool {
        matches!(self, Self::Modify | Self::Remove)
    }

    /// Whether records of this kind carry an after-image.
    pub fn has_new_image(&self) -> bool {
        matches!(self, Self::Insert | Self::Modify)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INSERT" => Ok(Self::Insert),
            "MODIFY" => Ok(Self::Modify),
            "REMOVE" => Ok(Self::Remove),
            other => Err(TypeError::UnknownOperation(other.to_string())),
        }
    }
}

/// The primary key of the changed item.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyTuple {
    pub pk: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sk: Option<String>,
}

impl KeyTuple {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: Some(sk.into()),
        }
    }
}

impl fmt::Display for KeyTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sk {
            Some(sk) => write!(f, "{}/{}", self.pk, sk),
            None => f.write_str(&self.pk),
        }
    }
}

/// Names of the key attributes in the source table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    pub partition_key: String,
    /// `None` for tables without a sort key.
    pub sort_key: Option<String>,
}

impl Default for KeySchema {
    fn default() -> Self {
        Self {
            partition_key: "pk".into(),
            sort_key: Some("sk".into()),
        }
    }
}
