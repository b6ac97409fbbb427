//! Sample data for demos and local development.

use bloodlink_core::{BloodRequest, RecordId, RequestStatus, Urgency, BLOOD_GROUPS};
use rand::Rng;

use crate::storage::MemoryRecordStore;

const HOUR_MILLIS: i64 = 60 * 60 * 1000;
const DAY_MILLIS: i64 = 24 * HOUR_MILLIS;

/// Six hand-written open requests, created between one and eight hours
/// before `now_millis`.
#[must_use]
pub fn sample_requests(now_millis: i64) -> Vec<BloodRequest> {
    let sample = |n: u32,
                  name: &str,
                  phone: &str,
                  blood_group: &str,
                  (state, city, hospital): (&str, &str, &str),
                  urgency: Urgency,
                  units_needed: u32,
                  description: &str,
                  hours_ago: i64| BloodRequest {
        id: RecordId::new(format!("sample-{n:02}")),
        created_at_millis: now_millis - hours_ago * HOUR_MILLIS,
        status: RequestStatus::Open,
        name: name.to_string(),
        phone: phone.to_string(),
        blood_group: blood_group.to_string(),
        state: state.to_string(),
        city: city.to_string(),
        hospital: hospital.to_string(),
        urgency,
        units_needed,
        description: description.to_string(),
        reason: None,
    };

    vec![
        sample(
            1,
            "Abhay Kumar",
            "+91 98765 43210",
            "O+",
            ("West Bengal", "Kolkata", "Apollo Hospital"),
            Urgency::Critical,
            2,
            "Emergency surgery required",
            2,
        ),
        sample(
            2,
            "Anjali Verma",
            "+91 87654 32109",
            "A+",
            ("Delhi", "New Delhi", "Max Healthcare"),
            Urgency::High,
            1,
            "Post-operative transfusion needed",
            3,
        ),
        sample(
            3,
            "Rajesh Singh",
            "+91 76543 21098",
            "B+",
            ("Maharashtra", "Mumbai", "Lilavati Hospital"),
            Urgency::High,
            3,
            "Accident victim, urgent blood needed",
            1,
        ),
        sample(
            4,
            "Priya Sharma",
            "+91 65432 10987",
            "AB-",
            ("Karnataka", "Bangalore", "Fortis Hospital"),
            Urgency::Critical,
            2,
            "Rare blood group needed urgently",
            4,
        ),
        sample(
            5,
            "Vikram Desai",
            "+91 54321 09876",
            "O-",
            ("Tamil Nadu", "Chennai", "Apollo Speciality Hospital"),
            Urgency::Normal,
            1,
            "Routine blood transfusion",
            6,
        ),
        sample(
            6,
            "Neha Patel",
            "+91 43210 98765",
            "B-",
            ("Gujarat", "Ahmedabad", "Sterling Hospital"),
            Urgency::Normal,
            1,
            "Planned surgery blood requirement",
            8,
        ),
    ]
}

const STATES: [(&str, &str); 6] = [
    ("West Bengal", "Kolkata"),
    ("Delhi", "New Delhi"),
    ("Maharashtra", "Mumbai"),
    ("Karnataka", "Bangalore"),
    ("Tamil Nadu", "Chennai"),
    ("Gujarat", "Ahmedabad"),
];

const URGENCIES: [Urgency; 5] = [
    Urgency::Low,
    Urgency::Normal,
    Urgency::High,
    Urgency::Urgent,
    Urgency::Critical,
];

fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

/// Inserts `count` synthetic requests spread over the last 30 days.
///
/// Roughly one in four is already fulfilled. Ids are assigned by the store.
pub fn seed_random<R: Rng + ?Sized>(
    store: &MemoryRecordStore,
    collection: &str,
    count: usize,
    rng: &mut R,
) -> Vec<RecordId> {
    let now = store.now_millis();
    let mut ids = Vec::with_capacity(count);
    for n in 0..count {
        let (state, city) = *pick(rng, &STATES);
        let status = if rng.random_bool(0.25) {
            RequestStatus::Fulfilled
        } else {
            RequestStatus::Open
        };
        let request = BloodRequest {
            id: RecordId::new(String::new()),
            created_at_millis: now - rng.random_range(0..30 * DAY_MILLIS),
            status,
            name: format!("Requester {}", n + 1),
            phone: format!(
                "+91 9{:04} {:05}",
                rng.random_range(0..10_000),
                rng.random_range(0..100_000)
            ),
            blood_group: (*pick(rng, &BLOOD_GROUPS)).to_string(),
            state: state.to_string(),
            city: city.to_string(),
            hospital: format!("{city} General Hospital"),
            urgency: *pick(rng, &URGENCIES),
            units_needed: rng.random_range(1..=4),
            description: "Synthetic request".to_string(),
            reason: None,
        };
        ids.push(store.insert(collection, request.to_document()));
    }
    tracing::info!(collection, count, "seeded synthetic requests");
    ids
}

/// Inserts [`sample_requests`] stamped relative to the store's clock.
pub fn seed_samples(store: &MemoryRecordStore, collection: &str) -> usize {
    let samples = sample_requests(store.now_millis());
    for request in &samples {
        store.insert_request(collection, request);
    }
    samples.len()
}
