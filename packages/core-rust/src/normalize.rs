//! Store-boundary normalization of raw documents into [`BloodRequest`].
//!
//! Documents written by different request forms disagree on field names
//! (`phone` vs `phoneNumber`, `name` vs `fullName`) and on how `createdAt`
//! is encoded. All of that is resolved here, once. A document without a
//! usable ordering field cannot be placed in the feed and is rejected.

use serde_json::{Map, Value};

use crate::types::{BloodRequest, RecordId, RequestStatus, Urgency};

const MILLIS_PER_SECOND: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;

/// A document exactly as a store returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    /// Store-assigned document id.
    pub id: String,
    /// Document body.
    pub fields: Map<String, Value>,
}

impl RawDocument {
    /// Creates a document from an id and body.
    #[must_use]
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Creates a document from a JSON value. Returns `None` unless `body` is an object.
    #[must_use]
    pub fn from_value(id: impl Into<String>, body: Value) -> Option<Self> {
        match body {
            Value::Object(fields) => Some(Self::new(id, fields)),
            _ => None,
        }
    }

    /// Creation time in millis, if the document carries a parseable one.
    #[must_use]
    pub fn created_at_millis(&self) -> Option<i64> {
        self.fields.get("createdAt").and_then(parse_millis)
    }
}

/// Why a raw document could not become a [`BloodRequest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("document has an empty id")]
    MissingId,
    #[error("document {id} has no usable createdAt field")]
    MissingOrderingField { id: String },
    #[error("document {id} has unknown status {status:?}")]
    InvalidStatus { id: String, status: String },
}

/// Converts a raw document into the canonical record.
///
/// # Errors
///
/// Returns [`NormalizeError`] when the id is empty, `createdAt` is missing
/// or unparseable, or `status` holds an unknown token.
pub fn normalize(doc: &RawDocument) -> Result<BloodRequest, NormalizeError> {
    if doc.id.is_empty() {
        return Err(NormalizeError::MissingId);
    }
    let fields = &doc.fields;

    let created_at_millis =
        doc.created_at_millis()
            .ok_or_else(|| NormalizeError::MissingOrderingField {
                id: doc.id.clone(),
            })?;

    let status = match fields.get("status") {
        None | Some(Value::Null) => RequestStatus::Open,
        Some(Value::String(token)) => {
            RequestStatus::parse(token).ok_or_else(|| NormalizeError::InvalidStatus {
                id: doc.id.clone(),
                status: token.clone(),
            })?
        }
        Some(other) => {
            return Err(NormalizeError::InvalidStatus {
                id: doc.id.clone(),
                status: other.to_string(),
            })
        }
    };

    let reason = text_field(fields, &["reason"]);

    Ok(BloodRequest {
        id: RecordId::new(doc.id.clone()),
        created_at_millis,
        status,
        name: text_field(fields, &["name", "fullName"]).unwrap_or_default(),
        phone: text_field(fields, &["phone", "phoneNumber"]).unwrap_or_default(),
        blood_group: text_field(fields, &["bloodGroup"]).unwrap_or_default(),
        state: text_field(fields, &["state"]).unwrap_or_default(),
        city: text_field(fields, &["city"]).unwrap_or_default(),
        hospital: text_field(fields, &["hospital"]).unwrap_or_default(),
        urgency: text_field(fields, &["urgency"])
            .map(|token| Urgency::from_token(&token))
            .unwrap_or_default(),
        units_needed: fields.get("unitsNeeded").map_or(0, parse_units),
        description: text_field(fields, &["description"]).unwrap_or_default(),
        reason: reason.filter(|r| !r.is_empty()),
    })
}

impl BloodRequest {
    /// Canonical camelCase document body for this record (without the id).
    #[must_use]
    pub fn to_document(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("createdAt".into(), Value::from(self.created_at_millis));
        fields.insert("status".into(), Value::from(self.status.as_str()));
        fields.insert("name".into(), Value::from(self.name.clone()));
        fields.insert("phone".into(), Value::from(self.phone.clone()));
        fields.insert("bloodGroup".into(), Value::from(self.blood_group.clone()));
        fields.insert("state".into(), Value::from(self.state.clone()));
        fields.insert("city".into(), Value::from(self.city.clone()));
        fields.insert("hospital".into(), Value::from(self.hospital.clone()));
        if let Some(token) = self.urgency.as_token() {
            fields.insert("urgency".into(), Value::from(token));
        }
        fields.insert("unitsNeeded".into(), Value::from(self.units_needed));
        fields.insert("description".into(), Value::from(self.description.clone()));
        if let Some(reason) = &self.reason {
            fields.insert("reason".into(), Value::from(reason.clone()));
        }
        fields
    }

    /// Wraps [`to_document`](Self::to_document) with this record's id.
    #[must_use]
    pub fn to_raw(&self) -> RawDocument {
        RawDocument::new(self.id.as_str(), self.to_document())
    }
}

/// First non-null value among `names`, rendered as text.
fn text_field(fields: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match fields.get(*name) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Parses `createdAt` from integer millis, a numeric string, or a
/// `{seconds, nanoseconds}` timestamp object (with or without leading `_`).
fn parse_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| float_millis(n.as_f64()?)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Object(obj) => {
            let seconds = obj
                .get("seconds")
                .or_else(|| obj.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = obj
                .get("nanoseconds")
                .or_else(|| obj.get("_nanoseconds"))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            seconds
                .checked_mul(MILLIS_PER_SECOND)?
                .checked_add(nanos / NANOS_PER_MILLI)
        }
        _ => None,
    }
}

// Float timestamps are whole milliseconds in practice; the fraction is dropped.
#[allow(clippy::cast_possible_truncation)]
fn float_millis(value: f64) -> Option<i64> {
    if value.is_finite() && value.abs() < 9.0e15 {
        Some(value.floor() as i64)
    } else {
        None
    }
}

fn parse_units(value: &Value) -> u32 {
    let units = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    units.map_or(0, |u| u32::try_from(u).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(id: &str, body: Value) -> RawDocument {
        RawDocument::from_value(id, body).expect("object body")
    }

    #[test]
    fn normalizes_canonical_document() {
        let raw = doc(
            "abc",
            json!({
                "name": "Abhay Kumar",
                "phone": "+91 98765 43210",
                "bloodGroup": "O+",
                "state": "West Bengal",
                "city": "Kolkata",
                "hospital": "Apollo Hospital",
                "urgency": "critical",
                "unitsNeeded": 2,
                "description": "Emergency surgery required",
                "status": "open",
                "createdAt": 1_700_000_000_000_i64,
            }),
        );
        let record = normalize(&raw).expect("valid");
        assert_eq!(record.id.as_str(), "abc");
        assert_eq!(record.created_at_millis, 1_700_000_000_000);
        assert_eq!(record.urgency, Urgency::Critical);
        assert_eq!(record.units_needed, 2);
        assert_eq!(record.status, RequestStatus::Open);
        assert_eq!(record.reason, None);
    }

    #[test]
    fn alternate_field_names_are_accepted() {
        let raw = doc(
            "x",
            json!({"fullName": "Sneha", "phoneNumber": "+91 1", "createdAt": 5}),
        );
        let record = normalize(&raw).expect("valid");
        assert_eq!(record.name, "Sneha");
        assert_eq!(record.phone, "+91 1");
    }

    #[test]
    fn primary_field_name_wins_over_alternate() {
        let raw = doc(
            "x",
            json!({"phone": "primary", "phoneNumber": "alt", "createdAt": 5}),
        );
        assert_eq!(normalize(&raw).expect("valid").phone, "primary");
    }

    #[test]
    fn missing_status_defaults_to_open() {
        let raw = doc("x", json!({"createdAt": 5}));
        assert_eq!(normalize(&raw).expect("valid").status, RequestStatus::Open);
        let raw = doc("y", json!({"createdAt": 5, "status": null}));
        assert_eq!(normalize(&raw).expect("valid").status, RequestStatus::Open);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let raw = doc("x", json!({"createdAt": 5, "status": "closed"}));
        assert_eq!(
            normalize(&raw),
            Err(NormalizeError::InvalidStatus {
                id: "x".into(),
                status: "closed".into()
            })
        );
    }

    #[test]
    fn timestamp_object_forms() {
        let raw = doc(
            "x",
            json!({"createdAt": {"seconds": 1_700_000_000, "nanoseconds": 250_000_000}}),
        );
        assert_eq!(normalize(&raw).expect("valid").created_at_millis, 1_700_000_000_250);

        let raw = doc("y", json!({"createdAt": {"_seconds": 10, "_nanoseconds": 0}}));
        assert_eq!(normalize(&raw).expect("valid").created_at_millis, 10_000);
    }

    #[test]
    fn numeric_string_and_float_timestamps() {
        let raw = doc("x", json!({"createdAt": " 1234 "}));
        assert_eq!(normalize(&raw).expect("valid").created_at_millis, 1234);
        let raw = doc("y", json!({"createdAt": 99.7}));
        assert_eq!(normalize(&raw).expect("valid").created_at_millis, 99);
    }

    #[test]
    fn missing_created_at_is_malformed() {
        let raw = doc("x", json!({"name": "no time"}));
        assert_eq!(
            normalize(&raw),
            Err(NormalizeError::MissingOrderingField { id: "x".into() })
        );
        let raw = doc("y", json!({"createdAt": "yesterday"}));
        assert!(matches!(
            normalize(&raw),
            Err(NormalizeError::MissingOrderingField { .. })
        ));
    }

    #[test]
    fn empty_id_is_rejected() {
        let raw = doc("", json!({"createdAt": 1}));
        assert_eq!(normalize(&raw), Err(NormalizeError::MissingId));
    }

    #[test]
    fn units_accept_strings_and_default_to_zero() {
        let raw = doc("x", json!({"createdAt": 1, "unitsNeeded": "3"}));
        assert_eq!(normalize(&raw).expect("valid").units_needed, 3);
        let raw = doc("y", json!({"createdAt": 1, "unitsNeeded": -2}));
        assert_eq!(normalize(&raw).expect("valid").units_needed, 0);
        let raw = doc("z", json!({"createdAt": 1}));
        assert_eq!(normalize(&raw).expect("valid").units_needed, 0);
    }

    #[test]
    fn to_document_normalizes_back_to_same_record() {
        let raw = doc(
            "r-7",
            json!({
                "name": "Priya",
                "phone": "+91 2",
                "bloodGroup": "AB-",
                "urgency": "high",
                "unitsNeeded": 4,
                "reason": "Surgery/Operation",
                "status": "fulfilled",
                "createdAt": 42,
            }),
        );
        let record = normalize(&raw).expect("valid");
        assert_eq!(normalize(&record.to_raw()), Ok(record));
    }

    #[test]
    fn from_value_requires_object() {
        assert!(RawDocument::from_value("x", json!([1, 2])).is_none());
    }
}
