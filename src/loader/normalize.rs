//! Raw document unwrapping and field normalization.
//!
//! Source documents wrap their record array under a single named key and use
//! their own field names; this module maps them onto the canonical records.

use crate::config::FieldMap;
use crate::models::{PolicyRecord, RenewalClass, RenewalRecord};
use anyhow::{bail, Result};
use serde_json::{Map, Value};
use tracing::warn;

pub type RawRecord = Map<String, Value>;

/// Pull the record array out of a source document.
///
/// Accepts `[{"<key>": [...]}]`, `{"<key>": [...]}` or a bare record array.
pub fn extract_records(document: Value, key: &str) -> Result<Vec<RawRecord>> {
    let records = match document {
        Value::Object(mut object) => match object.remove(key) {
            Some(Value::Array(records)) => records,
            Some(other) => bail!("Key \"{}\" holds {} instead of an array", key, kind(&other)),
            None => bail!("Document has no \"{}\" key", key),
        },
        Value::Array(items) => {
            let wrapped = items.iter().position(|item| {
                item.as_object()
                    .is_some_and(|object| object.get(key).is_some_and(Value::is_array))
            });
            match wrapped {
                Some(position) => match items.into_iter().nth(position) {
                    Some(Value::Object(mut object)) => match object.remove(key) {
                        Some(Value::Array(records)) => records,
                        _ => Vec::new(),
                    },
                    _ => Vec::new(),
                },
                None if items.iter().any(is_wrapper) => {
                    bail!("Document has no \"{}\" key", key)
                }
                None => items,
            }
        }
        other => bail!("Expected an object or array, found {}", kind(&other)),
    };

    let total = records.len();
    let objects: Vec<RawRecord> = records
        .into_iter()
        .filter_map(|record| match record {
            Value::Object(object) => Some(object),
            _ => None,
        })
        .collect();

    if objects.len() < total {
        warn!(
            "Skipped {} non-object entries under \"{}\"",
            total - objects.len(),
            key
        );
    }

    Ok(objects)
}

/// Rename a raw year-N record into the canonical schema.
pub fn to_policy_record(raw: &RawRecord, fields: &FieldMap) -> PolicyRecord {
    let id = text(raw, &fields.id);
    let label = id.as_deref().unwrap_or("<no id>");

    PolicyRecord {
        agent: text(raw, &fields.agent),
        first_name: text(raw, &fields.first_name),
        last_name: text(raw, &fields.last_name),
        members: count(raw, &fields.members, label),
        company: text(raw, &fields.company),
        commission: amount(raw, &fields.commission, label),
        id,
    }
}

/// Rename a raw year-N+1 record into the canonical schema.
pub fn to_renewal_record(raw: &RawRecord, fields: &FieldMap) -> RenewalRecord {
    let policy = to_policy_record(raw, fields);

    let class = text(raw, &fields.class).and_then(|tag| {
        let parsed = RenewalClass::parse(&tag);
        if parsed.is_none() {
            warn!(
                "Record {}: unrecognised renewal tag \"{}\"",
                policy.id.as_deref().unwrap_or("<no id>"),
                tag
            );
        }
        parsed
    });

    RenewalRecord {
        region: text(raw, &fields.region),
        license: text(raw, &fields.license),
        class,
        policy,
    }
}

/// Trimmed non-empty text. Numbers are rendered as text.
fn text(raw: &RawRecord, field: &str) -> Option<String> {
    match raw.get(field)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-negative whole number from a number or numeric string.
fn count(raw: &RawRecord, field: &str, id: &str) -> Option<u32> {
    let value = raw.get(field)?;
    let parsed = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) if s.trim().is_empty() => return None,
        Value::String(s) => s.trim().parse::<u32>().ok(),
        Value::Null => return None,
        _ => None,
    };

    if parsed.is_none() {
        warn!("Record {}: cannot read {} from {}", id, field, value);
    }
    parsed
}

/// Decimal amount from a number or a string such as `"$1,250.00"`.
fn amount(raw: &RawRecord, field: &str, id: &str) -> Option<f64> {
    let value = raw.get(field)?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' '))
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok()
        }
        Value::Null => return None,
        _ => None,
    };

    if parsed.is_none() {
        warn!("Record {}: cannot read {} from {}", id, field, value);
    }
    parsed
}

/// An object holding a record array under some key, rather than a record.
fn is_wrapper(item: &Value) -> bool {
    item.as_object()
        .is_some_and(|object| object.values().any(Value::is_array))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
