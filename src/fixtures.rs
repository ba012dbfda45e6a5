use chrono::{Duration, SecondsFormat, Utc};
use database::{NewEvent, MAX_NAME_LENGTH};
use fake::{
    faker::{
        address::en::{BuildingNumber, StreetName},
        company::en::CatchPhrase,
        name::en::Name,
    },
    Fake,
};
use rand::Rng;
use std::collections::HashSet;

/// The number of events generated when no count is requested
pub const DEFAULT_COUNT: usize = 10;

/// The most events that can be generated at once
pub const MAX_COUNT: usize = 100;

/// The furthest into the future a generated event can be scheduled
const MAX_LEAD_TIME_DAYS: i64 = 365;

/// Generate `n` random events with distinct names
///
/// Hosts are drawn from a pool of random names and may repeat. The address and
/// schedule are each present about half of the time, and schedules always lie
/// in the future.
pub fn generate<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<NewEvent> {
    let mut names = HashSet::with_capacity(n);

    (0..n)
        .map(|_| {
            let name = loop {
                let candidate = clamp(CatchPhrase().fake_with_rng(rng));
                if names.insert(candidate.clone()) {
                    break candidate;
                }
            };

            let address = rng.gen_bool(0.5).then(|| {
                let number: String = BuildingNumber().fake_with_rng(rng);
                let street: String = StreetName().fake_with_rng(rng);
                format!("{number} {street}")
            });

            let schedule = rng.gen_bool(0.5).then(|| {
                let lead = Duration::seconds(rng.gen_range(60..=MAX_LEAD_TIME_DAYS * 24 * 60 * 60));
                (Utc::now() + lead).to_rfc3339_opts(SecondsFormat::Secs, false)
            });

            NewEvent {
                name,
                address,
                schedule,
                host_name: Some(clamp(Name().fake_with_rng(rng))),
            }
        })
        .collect()
}

/// Fit generated text within the name length limit
fn clamp(text: String) -> String {
    let clamped = match text.char_indices().nth(MAX_NAME_LENGTH) {
        Some((end, _)) => &text[..end],
        None => &text,
    };
    clamped.trim().trim_end_matches('.').to_owned()
}
