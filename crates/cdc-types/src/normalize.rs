//! Image normalization: a raw stream record in, plain trees and keys out.

use serde_json::{Map, Value};

use crate::attribute::{unmarshall, Image};
use crate::error::{TypeError, TypeResult};
use crate::record::{KeySchema, KeyTuple, Operation, StreamRecord};

/// A stream record decoded into plain, untyped form.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedRecord {
    pub event_id: String,
    pub operation: Operation,
    pub keys: KeyTuple,
    /// Full before-image (present for MODIFY and REMOVE).
    pub old_image: Option<Image>,
    /// Full after-image (present for INSERT and MODIFY).
    pub new_image: Option<Image>,
    /// Size of the record as measured by the stream, if reported.
    pub size_bytes: Option<u64>,
}

/// Decode a stream record.
///
/// Fails if a mandatory field is absent, the operation is unknown, an image
/// the operation requires is missing, a key attribute is missing or not a
/// string, or any typed attribute cannot be decoded.
pub fn normalize(record: &StreamRecord, schema: &KeySchema) -> TypeResult<NormalizedRecord> {
    let operation: Operation = record
        .event_name
        .as_deref()
        .ok_or(TypeError::MissingField("eventName"))?
        .parse()?;
    let event_id = record
        .event_id
        .clone()
        .ok_or(TypeError::MissingField("eventID"))?;
    let payload = record
        .dynamodb
        .as_ref()
        .ok_or(TypeError::MissingField("dynamodb"))?;

    let keys = extract_keys(payload.keys.as_ref(), schema)?;
    let old_image = payload.old_image.as_ref().map(unmarshall).transpose()?;
    let new_image = payload.new_image.as_ref().map(unmarshall).transpose()?;

    if operation.has_old_image() && old_image.is_none() {
        return Err(TypeError::MissingImage {
            operation: operation.to_string(),
            image: "before",
        });
    }
    if operation.has_new_image() && new_image.is_none() {
        return Err(TypeError::MissingImage {
            operation: operation.to_string(),
            image: "after",
        });
    }

    Ok(NormalizedRecord {
        event_id,
        operation,
        keys,
        old_image,
        new_image,
        size_bytes: payload.size_bytes,
    })
}

fn extract_keys(typed: Option<&Map<String, Value>>, schema: &KeySchema) -> TypeResult<KeyTuple> {
    let keys = typed
        .map(unmarshall)
        .transpose()?
        .ok_or(TypeError::MissingField("Keys"))?;

    let pk = string_key(&keys, &schema.partition_key)?;
    let sk = schema
        .sort_key
        .as_deref()
        .map(|name| string_key(&keys, name))
        .transpose()?;
    Ok(KeyTuple { pk, sk })
}

fn string_key(keys: &Image, name: &str) -> TypeResult<String> {
    match keys.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(TypeError::KeyNotString(name.to_string())),
        None => Err(TypeError::MissingKey(name.to_string())),
    }
}
