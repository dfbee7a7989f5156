//! Per-provider quota tracking
//!
//! Each provider owns one [`QuotaTracker`]. The tracker keeps a daily request
//! counter and a per-minute window holding both a request counter and a token
//! counter. The two windows are independent: crossing a minute boundary never
//! touches the daily counter and vice versa.
//!
//! A limit of `0` means "no limit enforced".

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Configured limits for one provider. `0` disables a limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaLimits {
    /// Requests allowed per day
    #[serde(default)]
    pub max_daily: u32,

    /// Requests allowed per minute
    #[serde(default)]
    pub max_per_minute: u32,

    /// Tokens allowed per minute
    #[serde(default)]
    pub max_tokens_per_minute: u32,
}

impl QuotaLimits {
    /// No limits at all
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_daily(mut self, max: u32) -> Self {
        self.max_daily = max;
        self
    }

    pub fn with_max_per_minute(mut self, max: u32) -> Self {
        self.max_per_minute = max;
        self
    }

    pub fn with_max_tokens_per_minute(mut self, max: u32) -> Self {
        self.max_tokens_per_minute = max;
        self
    }
}

/// Point-in-time copy of a tracker's counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaSnapshot {
    pub limits: QuotaLimits,
    pub requests_today: u32,
    pub day_window_start: DateTime<Utc>,
    pub requests_this_minute: u32,
    pub tokens_this_minute: u32,
    pub minute_window_start: DateTime<Utc>,
}

#[derive(Debug)]
struct QuotaState {
    requests_today: u32,
    day_window_start: DateTime<Utc>,
    requests_this_minute: u32,
    tokens_this_minute: u32,
    minute_window_start: DateTime<Utc>,
}

impl QuotaState {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            requests_today: 0,
            day_window_start: truncate(now, day()),
            requests_this_minute: 0,
            tokens_this_minute: 0,
            minute_window_start: truncate(now, minute()),
        }
    }

    fn roll_day(&mut self, now: DateTime<Utc>) {
        if now.signed_duration_since(self.day_window_start) > day() {
            debug!(
                requests_today = self.requests_today,
                "Daily quota window elapsed, resetting"
            );
            self.requests_today = 0;
            self.day_window_start = truncate(now, day());
        }
    }

    fn roll_minute(&mut self, now: DateTime<Utc>) {
        if now.signed_duration_since(self.minute_window_start) > minute() {
            self.requests_this_minute = 0;
            self.tokens_this_minute = 0;
            self.minute_window_start = truncate(now, minute());
        }
    }
}

fn day() -> Duration {
    Duration::hours(24)
}

fn minute() -> Duration {
    Duration::minutes(1)
}

fn truncate(now: DateTime<Utc>, period: Duration) -> DateTime<Utc> {
    now.duration_trunc(period).unwrap_or(now)
}

fn within(limit: u32, used: u64) -> bool {
    limit == 0 || used < u64::from(limit)
}

/// Tracks daily and per-minute usage for a single provider.
///
/// All counters sit behind one mutex owned by the tracker, so two callers
/// racing the same provider serialize while callers on different providers
/// never contend.
#[derive(Debug)]
pub struct QuotaTracker {
    limits: QuotaLimits,
    state: Mutex<QuotaState>,
}

impl QuotaTracker {
    /// Create a tracker whose windows start now
    pub fn new(limits: QuotaLimits) -> Self {
        Self::starting_at(limits, Utc::now())
    }

    /// Create a tracker whose windows start at `now`
    pub fn starting_at(limits: QuotaLimits, now: DateTime<Utc>) -> Self {
        Self {
            limits,
            state: Mutex::new(QuotaState::new(now)),
        }
    }

    /// A tracker that never refuses work
    pub fn unlimited() -> Self {
        Self::new(QuotaLimits::unlimited())
    }

    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }

    fn lock(&self) -> MutexGuard<'_, QuotaState> {
        // Counters stay consistent even if a holder panicked mid-read.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True iff the daily request budget has room for one more request
    pub fn can_serve_daily(&self) -> bool {
        self.can_serve_daily_at(Utc::now())
    }

    pub fn can_serve_daily_at(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.lock();
        state.roll_day(now);
        within(self.limits.max_daily, u64::from(state.requests_today))
    }

    /// True iff the per-minute request budget has room for one more request
    pub fn can_serve_per_minute(&self) -> bool {
        self.can_serve_per_minute_at(Utc::now())
    }

    pub fn can_serve_per_minute_at(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.lock();
        state.roll_minute(now);
        within(self.limits.max_per_minute, u64::from(state.requests_this_minute))
    }

    /// True iff `estimated` more tokens fit in the current minute
    pub fn can_serve_tokens(&self, estimated: u32) -> bool {
        self.can_serve_tokens_at(estimated, Utc::now())
    }

    pub fn can_serve_tokens_at(&self, estimated: u32, now: DateTime<Utc>) -> bool {
        let mut state = self.lock();
        state.roll_minute(now);
        let projected = u64::from(state.tokens_this_minute) + u64::from(estimated);
        self.limits.max_tokens_per_minute == 0
            || projected <= u64::from(self.limits.max_tokens_per_minute)
    }

    /// Claim one request slot if both request budgets have room.
    ///
    /// The check and the increment happen under one lock, so concurrent
    /// callers can never overshoot a limit. Dropping the reservation without
    /// [`QuotaReservation::commit`] gives the slot back.
    pub fn try_reserve(&self) -> Option<QuotaReservation<'_>> {
        self.try_reserve_at(Utc::now())
    }

    pub fn try_reserve_at(&self, now: DateTime<Utc>) -> Option<QuotaReservation<'_>> {
        let mut state = self.lock();
        state.roll_day(now);
        state.roll_minute(now);
        if !within(self.limits.max_daily, u64::from(state.requests_today))
            || !within(self.limits.max_per_minute, u64::from(state.requests_this_minute))
        {
            return None;
        }

        state.requests_today = state.requests_today.saturating_add(1);
        state.requests_this_minute = state.requests_this_minute.saturating_add(1);
        Some(QuotaReservation {
            tracker: self,
            day_window_start: state.day_window_start,
            minute_window_start: state.minute_window_start,
            committed: false,
        })
    }

    /// Record one successful request that consumed `tokens_used` tokens
    pub fn record_usage(&self, tokens_used: u32) {
        self.record_usage_at(tokens_used, Utc::now())
    }

    pub fn record_usage_at(&self, tokens_used: u32, now: DateTime<Utc>) {
        let mut state = self.lock();
        state.roll_day(now);
        state.roll_minute(now);
        state.requests_today = state.requests_today.saturating_add(1);
        state.requests_this_minute = state.requests_this_minute.saturating_add(1);
        state.tokens_this_minute = state.tokens_this_minute.saturating_add(tokens_used);
    }

    /// Copy of the current counters, without rolling any window
    pub fn snapshot(&self) -> QuotaSnapshot {
        let state = self.lock();
        QuotaSnapshot {
            limits: self.limits,
            requests_today: state.requests_today,
            day_window_start: state.day_window_start,
            requests_this_minute: state.requests_this_minute,
            tokens_this_minute: state.tokens_this_minute,
            minute_window_start: state.minute_window_start,
        }
    }
}

/// A request slot held while a provider call is in flight
#[derive(Debug)]
#[must_use = "dropping a reservation releases the slot immediately"]
pub struct QuotaReservation<'a> {
    tracker: &'a QuotaTracker,
    day_window_start: DateTime<Utc>,
    minute_window_start: DateTime<Utc>,
    committed: bool,
}

impl QuotaReservation<'_> {
    /// Keep the slot and charge `tokens_used` to the current minute
    pub fn commit(self, tokens_used: u32) {
        self.commit_at(tokens_used, Utc::now())
    }

    pub fn commit_at(mut self, tokens_used: u32, now: DateTime<Utc>) {
        self.committed = true;
        let mut state = self.tracker.lock();
        state.roll_minute(now);
        state.tokens_this_minute = state.tokens_this_minute.saturating_add(tokens_used);
    }
}

impl Drop for QuotaReservation<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // A window that rolled meanwhile no longer holds this slot.
        let mut state = self.tracker.lock();
        if state.day_window_start == self.day_window_start {
            state.requests_today = state.requests_today.saturating_sub(1);
        }
        if state.minute_window_start == self.minute_window_start {
            state.requests_this_minute = state.requests_this_minute.saturating_sub(1);
        }
    }
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::unlimited()
    }
}
