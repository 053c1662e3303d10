//! Conversion between the stream's typed attribute encoding and plain trees.
//!
//! Every typed value is a single-entry object whose key names the type:
//! `{"S": "text"}`, `{"N": "42"}`, `{"M": {...}}`, `{"L": [...]}` and so on.
//! [`unmarshall`] strips the descriptors. [`marshall`] adds them back for
//! fixtures and tooling.

use serde_json::{Map, Number, Value};

use crate::error::{TypeError, TypeResult};

/// A plain item image: attribute name to untyped value, in stream order.
pub type Image = Map<String, Value>;

/// Decode a typed attribute map into a plain image.
pub fn unmarshall(typed: &Map<String, Value>) -> TypeResult<Image> {
    unmarshall_map(typed, "")
}

fn unmarshall_map(typed: &Map<String, Value>, prefix: &str) -> TypeResult<Image> {
    let mut out = Image::with_capacity(typed.len());
    for (name, attr) in typed {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        out.insert(name.clone(), unmarshall_value(attr, &path)?);
    }
    Ok(out)
}

fn unmarshall_value(attr: &Value, path: &str) -> TypeResult<Value> {
    let (tag, payload) = match attr.as_object() {
        Some(obj) if obj.len() == 1 => obj
            .iter()
            .next()
            .ok_or_else(|| TypeError::invalid(path, "empty type descriptor"))?,
        _ => {
            return Err(TypeError::invalid(
                path,
                "expected a single-entry type descriptor",
            ))
        }
    };

    match tag.as_str() {
        "S" | "B" => payload
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| TypeError::invalid(path, format!("{tag} payload must be a string"))),
        "N" => {
            let text = payload
                .as_str()
                .ok_or_else(|| TypeError::invalid(path, "N payload must be a string"))?;
            parse_number(text, path)
        }
        "BOOL" => payload
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| TypeError::invalid(path, "BOOL payload must be a boolean")),
        "NULL" => match payload {
            Value::Bool(true) => Ok(Value::Null),
            _ => Err(TypeError::invalid(path, "NULL payload must be `true`")),
        },
        "M" => {
            let map = payload
                .as_object()
                .ok_or_else(|| TypeError::invalid(path, "M payload must be an object"))?;
            unmarshall_map(map, path).map(Value::Object)
        }
        "L" => {
            let items = payload
                .as_array()
                .ok_or_else(|| TypeError::invalid(path, "L payload must be an array"))?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| unmarshall_value(item, &format!("{path}[{i}]")))
                .collect::<TypeResult<Vec<_>>>()
                .map(Value::Array)
        }
        "SS" | "BS" => string_set(payload, tag, path)
            .map(|items| Value::Array(items.into_iter().map(Value::String).collect())),
        "NS" => string_set(payload, tag, path)?
            .iter()
            .map(|n| parse_number(n, path))
            .collect::<TypeResult<Vec<_>>>()
            .map(Value::Array),
        other => Err(TypeError::invalid(path, format!("unknown type tag `{other}`"))),
    }
}

fn string_set(payload: &Value, tag: &str, path: &str) -> TypeResult<Vec<String>> {
    let items = payload
        .as_array()
        .ok_or_else(|| TypeError::invalid(path, format!("{tag} payload must be an array")))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| TypeError::invalid(path, format!("{tag} members must be strings")))
        })
        .collect()
}

/// Parse a decimal string as an integer where exact, else as a finite float.
fn parse_number(text: &str, path: &str) -> TypeResult<Value> {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(Value::from(i));
    }
    if let Ok(u) = trimmed.parse::<u64>() {
        return Ok(Value::from(u));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| TypeError::invalid(path, format!("`{text}` is not a finite number")))
}

/// Encode a plain image with type descriptors.
///
/// Arrays become `L` lists; sets cannot be recovered from a plain tree.
pub fn marshall(image: &Image) -> Map<String, Value> {
    image
        .iter()
        .map(|(name, value)| (name.clone(), marshall_value(value)))
        .collect()
}

fn marshall_value(value: &Value) -> Value {
    let (tag, payload) = match value {
        Value::Null => ("NULL", Value::Bool(true)),
        Value::Bool(b) => ("BOOL", Value::Bool(*b)),
        Value::Number(n) => ("N", Value::String(n.to_string())),
        Value::String(s) => ("S", Value::String(s.clone())),
        Value::Array(items) => ("L", Value::Array(items.iter().map(marshall_value).collect())),
        Value::Object(map) => ("M", Value::Object(marshall(map))),
    };
    let mut descriptor = Map::with_capacity(1);
    descriptor.insert(tag.to_string(), payload);
    Value::Object(descriptor)
}
