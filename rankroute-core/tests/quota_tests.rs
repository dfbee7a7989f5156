//! Tests for per-provider quota windows
//!
//! Window behaviour is exercised through the clock-parameterised methods so
//! boundaries can be crossed deterministically.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rankroute_core::providers::{QuotaLimits, QuotaTracker};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 15).unwrap()
}

#[test]
fn test_repeated_checks_inside_window_keep_counter() {
    let tracker = QuotaTracker::starting_at(QuotaLimits::unlimited().with_max_daily(10), start());
    tracker.record_usage_at(1, start());
    tracker.record_usage_at(1, start());

    for minutes in 0..600 {
        assert!(tracker.can_serve_daily_at(start() + Duration::minutes(minutes)));
    }
    assert_eq!(tracker.snapshot().requests_today, 2);
}

#[test]
fn test_crossing_several_days_resets_once() {
    let tracker = QuotaTracker::starting_at(QuotaLimits::unlimited().with_max_daily(3), start());
    for _ in 0..3 {
        tracker.record_usage_at(1, start());
    }
    assert!(!tracker.can_serve_daily_at(start()));

    let much_later = start() + Duration::days(5);
    assert!(tracker.can_serve_daily_at(much_later));

    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.requests_today, 0);
    assert_eq!(
        snapshot.day_window_start,
        Utc.with_ymd_and_hms(2025, 6, 6, 0, 0, 0).unwrap()
    );

    // Checking again inside the new window changes nothing.
    assert!(tracker.can_serve_daily_at(much_later + Duration::hours(1)));
    assert_eq!(tracker.snapshot().day_window_start, snapshot.day_window_start);
}

#[test]
fn test_minute_window_resets_tokens_and_requests() {
    let limits = QuotaLimits::unlimited()
        .with_max_per_minute(2)
        .with_max_tokens_per_minute(100);
    let tracker = QuotaTracker::starting_at(limits, start());

    tracker.record_usage_at(60, start());
    tracker.record_usage_at(30, start());
    assert!(!tracker.can_serve_per_minute_at(start()));
    assert!(!tracker.can_serve_tokens_at(11, start()));
    assert!(tracker.can_serve_tokens_at(10, start()));

    let next = start() + Duration::seconds(90);
    assert!(tracker.can_serve_per_minute_at(next));
    assert!(tracker.can_serve_tokens_at(100, next));
    assert_eq!(tracker.snapshot().requests_today, 2);
}

#[test]
fn test_exact_period_does_not_reset() {
    // Window starts at 09:30:00; a reset needs strictly more than one minute.
    let tracker =
        QuotaTracker::starting_at(QuotaLimits::unlimited().with_max_per_minute(1), start());
    tracker.record_usage_at(1, start());

    let window_start = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap();
    assert!(!tracker.can_serve_per_minute_at(window_start + Duration::minutes(1)));
    assert!(tracker.can_serve_per_minute_at(
        window_start + Duration::minutes(1) + Duration::milliseconds(1)
    ));
}

#[test]
fn test_shared_tracker_across_threads() {
    let tracker = std::sync::Arc::new(QuotaTracker::new(QuotaLimits::unlimited()));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tracker = std::sync::Arc::clone(&tracker);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    tracker.record_usage(1);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(tracker.snapshot().requests_today, 800);
}

proptest! {
    #[test]
    fn prop_checks_within_day_never_change_counter(
        used in 0u32..20,
        offsets in proptest::collection::vec(0i64..(14 * 3600), 1..50),
    ) {
        // start() is 09:30; 14.5 hours later is still the same UTC day.
        let tracker = QuotaTracker::starting_at(
            QuotaLimits::unlimited().with_max_daily(1000),
            start(),
        );
        for _ in 0..used {
            tracker.record_usage_at(1, start());
        }
        for offset in offsets {
            tracker.can_serve_daily_at(start() + Duration::seconds(offset));
        }
        prop_assert_eq!(tracker.snapshot().requests_today, used);
    }

    #[test]
    fn prop_daily_limit_is_respected(limit in 1u32..50, attempts in 0u32..100) {
        let tracker = QuotaTracker::starting_at(
            QuotaLimits::unlimited().with_max_daily(limit),
            start(),
        );
        let mut served = 0;
        for _ in 0..attempts {
            if tracker.can_serve_daily_at(start()) {
                tracker.record_usage_at(1, start());
                served += 1;
            }
        }
        prop_assert_eq!(served, attempts.min(limit));
    }

    #[test]
    fn prop_reset_lands_on_midnight(days in 1i64..400, seconds in 1i64..86_400) {
        let tracker = QuotaTracker::starting_at(
            QuotaLimits::unlimited().with_max_daily(1),
            start(),
        );
        tracker.record_usage_at(1, start());

        let midnight = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let later = midnight + Duration::days(days) + Duration::seconds(seconds);
        prop_assert!(tracker.can_serve_daily_at(later));

        let snapshot = tracker.snapshot();
        prop_assert_eq!(snapshot.requests_today, 0);
        prop_assert_eq!(snapshot.day_window_start, midnight + Duration::days(days));
    }
}
