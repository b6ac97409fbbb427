use std::fmt;

use serde::{Deserialize, Serialize};

use crate::order::SortKey;

/// Blood groups in display order.
pub const BLOOD_GROUPS: [&str; 8] = ["O+", "O-", "A+", "A-", "B+", "B-", "AB+", "AB-"];

/// Store-assigned identifier of a record, unique within its collection.
///
/// Compared lexicographically (byte order). Used as the tie-breaker when two
/// records share the same creation time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Wraps an identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle status of a blood request.
///
/// Mutable after creation by moderation. Never affects ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Still looking for donors.
    Open,
    /// Marked as satisfied.
    Fulfilled,
}

impl RequestStatus {
    /// Wire token used in stored documents.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Fulfilled => "fulfilled",
        }
    }

    /// Parses a wire token, case-insensitively.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("open") {
            Some(Self::Open)
        } else if token.eq_ignore_ascii_case("fulfilled") {
            Some(Self::Fulfilled)
        } else {
            None
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How urgently blood is needed.
///
/// Request forms across the site used different vocabularies, so every
/// token seen in stored documents has a variant. Anything else (or a missing
/// field) maps to [`Urgency::Unspecified`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Normal,
    Medium,
    High,
    Urgent,
    Critical,
    #[default]
    Unspecified,
}

impl Urgency {
    /// Parses a stored token. Unknown tokens become `Unspecified`.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "normal" => Self::Normal,
            "medium" => Self::Medium,
            "high" => Self::High,
            "urgent" => Self::Urgent,
            "critical" => Self::Critical,
            _ => Self::Unspecified,
        }
    }

    /// Wire token used in stored documents. `Unspecified` has none.
    #[must_use]
    pub fn as_token(self) -> Option<&'static str> {
        match self {
            Self::Low => Some("low"),
            Self::Normal => Some("normal"),
            Self::Medium => Some("medium"),
            Self::High => Some("high"),
            Self::Urgent => Some("urgent"),
            Self::Critical => Some("critical"),
            Self::Unspecified => None,
        }
    }

    /// `true` for urgencies that warrant highlighting (high and above).
    #[must_use]
    pub fn is_pressing(self) -> bool {
        matches!(self, Self::High | Self::Urgent | Self::Critical)
    }
}

/// Canonical blood request record.
///
/// Produced only by [`normalize`](crate::normalize::normalize) at the store
/// boundary; nothing downstream branches on alternate field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodRequest {
    /// Store-assigned identifier.
    pub id: RecordId,
    /// Creation time in milliseconds since the Unix epoch. Immutable.
    pub created_at_millis: i64,
    /// Open or fulfilled.
    pub status: RequestStatus,
    /// Patient or requester name.
    pub name: String,
    /// Contact phone number.
    pub phone: String,
    /// Requested blood group, e.g. `"AB-"`.
    pub blood_group: String,
    pub state: String,
    pub city: String,
    pub hospital: String,
    pub urgency: Urgency,
    /// Number of units requested.
    pub units_needed: u32,
    pub description: String,
    /// Optional medical reason (surgery, accident, ...).
    pub reason: Option<String>,
}

impl BloodRequest {
    /// Composite feed ordering key: `(created_at desc, id asc)`.
    #[must_use]
    pub fn sort_key(&self) -> SortKey {
        SortKey::new(self.created_at_millis, self.id.clone())
    }

    /// `true` while the request is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == RequestStatus::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(RequestStatus::parse("OPEN"), Some(RequestStatus::Open));
        assert_eq!(RequestStatus::parse("Fulfilled"), Some(RequestStatus::Fulfilled));
        assert_eq!(RequestStatus::parse("closed"), None);
    }

    #[test]
    fn urgency_tokens() {
        assert_eq!(Urgency::from_token("Critical"), Urgency::Critical);
        assert_eq!(Urgency::from_token("whenever"), Urgency::Unspecified);
        assert_eq!(Urgency::Unspecified.as_token(), None);
        assert!(Urgency::Urgent.is_pressing());
        assert!(!Urgency::Normal.is_pressing());
    }

    #[test]
    fn record_id_orders_lexicographically() {
        assert!(RecordId::from("a") < RecordId::from("b"));
        assert!(RecordId::from("B") < RecordId::from("a"));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&RequestStatus::Fulfilled).expect("serialize");
        assert_eq!(json, "\"fulfilled\"");
    }
}
