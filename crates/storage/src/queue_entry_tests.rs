use super::*;
use chrono::Utc;

#[test]
fn new_entry_is_immediately_due() {
    let now = Utc::now();
    let entry = QueueEntry::new("start-process", serde_json::json!({}), now);
    assert!(entry.is_due(now));
    assert_eq!(entry.attempts, 0);
    assert_eq!(entry.status, QueueEntryStatus::Pending);
}

#[test]
fn backoff_always_moves_next_attempt_into_the_future() {
    let now = Utc::now();
    for attempts in 0..8 {
        let next = backoff_after(attempts, now);
        assert!(next > now, "attempts={attempts}");
    }
}

#[yare::parameterized(
    first_attempt  = { 0, 1, 2 },
    second_attempt = { 1, 2, 3 },
    third_attempt  = { 2, 4, 5 },
    capped_at_six  = { 6, 64, 65 },
    above_cap_stays_capped = { 12, 64, 65 },
)]
fn backoff_grows_exponentially_and_caps_at_six_attempts(attempts: u32, min_secs: i64, max_secs: i64) {
    let now = Utc::now();
    let delay = backoff_after(attempts, now) - now;
    assert!(
        delay.num_seconds() >= min_secs && delay.num_seconds() <= max_secs,
        "attempts={attempts} delay={delay:?} expected [{min_secs}, {max_secs}]s"
    );
}
