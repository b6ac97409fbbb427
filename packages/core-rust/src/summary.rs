use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{BloodRequest, RequestStatus};

/// Window considered "recent" by [`WindowSummary::recent`]: 24 hours.
pub const RECENT_WINDOW_MILLIS: i64 = 24 * 60 * 60 * 1_000;

/// Aggregate counts over a set of loaded requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
    pub total: usize,
    pub open: usize,
    pub fulfilled: usize,
    /// Requests with urgency high, urgent or critical.
    pub pressing: usize,
    /// Requests created within [`RECENT_WINDOW_MILLIS`] before `now`.
    pub recent: usize,
    pub by_blood_group: BTreeMap<String, usize>,
    pub by_state: BTreeMap<String, usize>,
}

impl WindowSummary {
    /// Folds `records` into a summary relative to `now_millis`.
    pub fn from_records<'a, I>(records: I, now_millis: i64) -> Self
    where
        I: IntoIterator<Item = &'a BloodRequest>,
    {
        let cutoff = now_millis.saturating_sub(RECENT_WINDOW_MILLIS);
        let mut summary = Self::default();
        for record in records {
            summary.total += 1;
            match record.status {
                RequestStatus::Open => summary.open += 1,
                RequestStatus::Fulfilled => summary.fulfilled += 1,
            }
            if record.urgency.is_pressing() {
                summary.pressing += 1;
            }
            if record.created_at_millis > cutoff {
                summary.recent += 1;
            }
            if !record.blood_group.is_empty() {
                *summary
                    .by_blood_group
                    .entry(record.blood_group.clone())
                    .or_default() += 1;
            }
            if !record.state.is_empty() {
                *summary.by_state.entry(record.state.clone()).or_default() += 1;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecordId, Urgency};

    fn request(
        id: &str,
        created_at_millis: i64,
        status: RequestStatus,
        group: &str,
        urgency: Urgency,
    ) -> BloodRequest {
        BloodRequest {
            id: RecordId::from(id),
            created_at_millis,
            status,
            name: String::new(),
            phone: String::new(),
            blood_group: group.to_string(),
            state: "Delhi".to_string(),
            city: String::new(),
            hospital: String::new(),
            urgency,
            units_needed: 1,
            description: String::new(),
            reason: None,
        }
    }

    #[test]
    fn counts_status_groups_and_recency() {
        let now = 10 * RECENT_WINDOW_MILLIS;
        let records = [
            request("a", now - 1_000, RequestStatus::Open, "O+", Urgency::Critical),
            request("b", now - 2 * RECENT_WINDOW_MILLIS, RequestStatus::Fulfilled, "O+", Urgency::Normal),
            request("c", now, RequestStatus::Open, "AB-", Urgency::High),
        ];
        let summary = WindowSummary::from_records(&records, now);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.open, 2);
        assert_eq!(summary.fulfilled, 1);
        assert_eq!(summary.pressing, 2);
        assert_eq!(summary.recent, 2);
        assert_eq!(summary.by_blood_group.get("O+"), Some(&2));
        assert_eq!(summary.by_blood_group.get("AB-"), Some(&1));
        assert_eq!(summary.by_state.get("Delhi"), Some(&3));
    }

    #[test]
    fn empty_window() {
        let summary = WindowSummary::from_records(std::iter::empty(), 0);
        assert_eq!(summary, WindowSummary::default());
    }
}
