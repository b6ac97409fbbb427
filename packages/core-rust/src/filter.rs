use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{BloodRequest, RequestStatus};

/// Row-level predicate over blood requests.
///
/// Either evaluated client-side over a loaded window or pushed down to a
/// store that can filter on the status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordFilter {
    /// Every record matches.
    All,
    /// Only records with the given status match.
    Status(RequestStatus),
}

impl RecordFilter {
    /// Evaluates the predicate against a record.
    #[must_use]
    pub fn matches(&self, record: &BloodRequest) -> bool {
        match self {
            Self::All => true,
            Self::Status(status) => record.status == *status,
        }
    }

    /// `true` if the filter lets every record through.
    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self::Status(RequestStatus::Open)
    }
}

impl fmt::Display for RecordFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Status(status) => f.write_str(status.as_str()),
        }
    }
}

/// Input that names no known filter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter {0:?}, expected one of: all, open, fulfilled")]
pub struct FilterParseError(pub String);

impl FromStr for RecordFilter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        RequestStatus::parse(token)
            .map(Self::Status)
            .ok_or_else(|| FilterParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecordId, Urgency};

    fn request(status: RequestStatus) -> BloodRequest {
        BloodRequest {
            id: RecordId::from("r1"),
            created_at_millis: 0,
            status,
            name: String::new(),
            phone: String::new(),
            blood_group: "O+".to_string(),
            state: String::new(),
            city: String::new(),
            hospital: String::new(),
            urgency: Urgency::Normal,
            units_needed: 1,
            description: String::new(),
            reason: None,
        }
    }

    #[test]
    fn status_filter_matches_only_that_status() {
        let open = request(RequestStatus::Open);
        let done = request(RequestStatus::Fulfilled);
        let filter = RecordFilter::Status(RequestStatus::Open);
        assert!(filter.matches(&open));
        assert!(!filter.matches(&done));
        assert!(RecordFilter::All.matches(&done));
    }

    #[test]
    fn default_is_open() {
        assert_eq!(RecordFilter::default(), RecordFilter::Status(RequestStatus::Open));
    }

    #[test]
    fn parses_display_tokens() {
        for filter in [
            RecordFilter::All,
            RecordFilter::Status(RequestStatus::Open),
            RecordFilter::Status(RequestStatus::Fulfilled),
        ] {
            assert_eq!(filter.to_string().parse::<RecordFilter>(), Ok(filter));
        }
        assert_eq!(" ALL ".parse::<RecordFilter>(), Ok(RecordFilter::All));
    }

    #[test]
    fn rejects_unknown_token() {
        let err = "pending".parse::<RecordFilter>().unwrap_err();
        assert_eq!(err, FilterParseError("pending".to_string()));
    }
}
