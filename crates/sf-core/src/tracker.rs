//! The check-in / streak / challenge engine.
//!
//! [`Tracker`] is the single entry point the transport layer calls. It owns
//! the store behind a mutex and serializes operations per user with a keyed
//! lock, so a check-in and a concurrent challenge-abandon for the same user
//! can never interleave. Operations for different users only contend on the
//! store lock itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::challenge::{ChallengeError, ChallengeEvent, Enrollment};
use crate::checkin::CheckIn;
use crate::clock::{Clock, local_today, offset_in_range};
use crate::store::{CheckInStore, EnrollmentStore, StoreError, UserProfile};
use crate::streak::{StreakSnapshot, compute_streaks};
use crate::types::UserId;

/// Engine errors.
///
/// Every failure is a typed result the caller can distinguish; nothing is
/// swallowed or retried internally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// The user identifier is not registered.
    #[error("unknown user: {0}")]
    UnknownUser(UserId),
    /// The check-in date is after the user's current date.
    #[error("check-in date {date} is after today ({today})")]
    FutureDate { date: NaiveDate, today: NaiveDate },
    /// Bad challenge configuration.
    #[error(transparent)]
    InvalidLength(#[from] ChallengeError),
    /// The day-boundary offset is not a plausible timezone offset.
    #[error("day-boundary offset out of range: {0} minutes")]
    InvalidOffset(i32),
    /// The backing store could not serve the request.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for TrackerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownUser(user) => Self::UnknownUser(user),
            StoreError::Unavailable(message) => Self::StoreUnavailable(message),
        }
    }
}

/// User-facing summary composed from the streak calculator and the challenge
/// engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Derived streak figures.
    pub streak: StreakSnapshot,
    /// The user's most recent enrollment, if they ever started a challenge.
    pub challenge: Option<Enrollment>,
}

/// Result of recording a check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInOutcome {
    /// The check-in as stored.
    pub check_in: CheckIn,
    /// What the check-in did to the active challenge, if anything.
    pub challenge_event: ChallengeEvent,
    /// Updated summary after the write.
    pub stats: StatsSnapshot,
}

/// Keyed per-user mutex.
///
/// The map itself is only locked long enough to clone out the per-user lock,
/// so holding one user's lock never blocks another user's operations.
#[derive(Debug, Default)]
struct UserLocks {
    inner: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    fn for_user(&self, user: &UserId) -> Result<Arc<Mutex<()>>, TrackerError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| TrackerError::StoreUnavailable("user lock poisoned".to_string()))?;
        Ok(Arc::clone(map.entry(user.clone()).or_default()))
    }
}

/// The engine context: store, clock, and per-user locks.
///
/// Constructed explicitly by the caller and passed wherever operations are
/// needed; there are no ambient singletons.
#[derive(Debug)]
pub struct Tracker<S, C> {
    store: Mutex<S>,
    clock: C,
    locks: UserLocks,
}

impl<S, C> Tracker<S, C>
where
    S: CheckInStore + EnrollmentStore,
    C: Clock,
{
    /// Creates a tracker over the given store and clock.
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store: Mutex::new(store),
            clock,
            locks: UserLocks::default(),
        }
    }

    /// Consumes the tracker, returning the store.
    pub fn into_store(self) -> S {
        self.store.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn store(&self) -> Result<MutexGuard<'_, S>, TrackerError> {
        self.store
            .lock()
            .map_err(|_| TrackerError::StoreUnavailable("store lock poisoned".to_string()))
    }

    fn lock_user(&self, user: &UserId) -> Result<Arc<Mutex<()>>, TrackerError> {
        self.locks.for_user(user)
    }

    fn profile(store: &S, user: &UserId) -> Result<UserProfile, TrackerError> {
        store
            .get_user(user)?
            .ok_or_else(|| TrackerError::UnknownUser(user.clone()))
    }

    /// Registers a user, or refreshes an existing profile.
    ///
    /// Registration is the only operation that accepts an unknown user; every
    /// other entry point fails with [`TrackerError::UnknownUser`].
    pub fn register_user(
        &self,
        user: UserId,
        display_name: Option<String>,
        utc_offset_minutes: i32,
    ) -> Result<UserProfile, TrackerError> {
        if !offset_in_range(utc_offset_minutes) {
            return Err(TrackerError::InvalidOffset(utc_offset_minutes));
        }

        let lock = self.lock_user(&user)?;
        let _guard = lock
            .lock()
            .map_err(|_| TrackerError::StoreUnavailable("user lock poisoned".to_string()))?;
        let mut store = self.store()?;

        let existing = store.get_user(&user)?;
        let profile = UserProfile {
            id: user.clone(),
            display_name: display_name.or_else(|| {
                existing.as_ref().and_then(|p| p.display_name.clone())
            }),
            utc_offset_minutes,
            is_active: true,
            created_at: existing
                .map(|p| p.created_at)
                .unwrap_or_else(|| self.clock.now_utc()),
        };
        store.upsert_user(&profile)?;
        tracing::debug!(user = %profile.id, "user registered");
        Ok(profile)
    }

    /// Records today's check-in and advances the challenge state.
    pub fn record_check_in(
        &self,
        user: &UserId,
        success: bool,
        note: Option<String>,
    ) -> Result<CheckInOutcome, TrackerError> {
        self.record_check_in_inner(user, None, success, note)
    }

    /// Records a check-in for an explicit date.
    ///
    /// The date must not be after the user's current date. Backfilled past
    /// dates are stored and reflected in streaks, but only a check-in for
    /// today moves an active challenge.
    pub fn record_check_in_on(
        &self,
        user: &UserId,
        date: NaiveDate,
        success: bool,
        note: Option<String>,
    ) -> Result<CheckInOutcome, TrackerError> {
        self.record_check_in_inner(user, Some(date), success, note)
    }

    fn record_check_in_inner(
        &self,
        user: &UserId,
        date: Option<NaiveDate>,
        success: bool,
        note: Option<String>,
    ) -> Result<CheckInOutcome, TrackerError> {
        let lock = self.lock_user(user)?;
        let _guard = lock
            .lock()
            .map_err(|_| TrackerError::StoreUnavailable("user lock poisoned".to_string()))?;
        let mut store = self.store()?;

        let profile = Self::profile(&store, user)?;
        let today = local_today(self.clock.now_utc(), profile.utc_offset_minutes);
        let date = date.unwrap_or(today);
        if date > today {
            return Err(TrackerError::FutureDate { date, today });
        }

        let check_in = CheckIn {
            user: user.clone(),
            date,
            success,
            note,
        };
        store.record_check_in(&check_in)?;
        tracing::debug!(user = %user, %date, success, "check-in recorded");

        let mut challenge_event = ChallengeEvent::NoChange;
        // Only a check-in for today moves the challenge; backfills do not.
        if date == today {
            if let Some(mut enrollment) = store.active_enrollment(user)? {
                challenge_event = enrollment.apply_check_in(date, success);
                if challenge_event != ChallengeEvent::NoChange {
                    store.save_enrollment(&enrollment)?;
                }
            }
        }

        let stats = Self::summarize(&store, user, today)?;
        Ok(CheckInOutcome {
            check_in,
            challenge_event,
            stats,
        })
    }

    /// Returns the user's summary without writing anything.
    pub fn stats(&self, user: &UserId) -> Result<StatsSnapshot, TrackerError> {
        let lock = self.lock_user(user)?;
        let _guard = lock
            .lock()
            .map_err(|_| TrackerError::StoreUnavailable("user lock poisoned".to_string()))?;
        let store = self.store()?;

        let profile = Self::profile(&store, user)?;
        let today = local_today(self.clock.now_utc(), profile.utc_offset_minutes);
        Self::summarize(&store, user, today)
    }

    /// Enrolls the user in a fixed-length challenge.
    ///
    /// Any existing active enrollment is abandoned first; the new enrollment
    /// starts at day zero.
    pub fn enroll(&self, user: &UserId, length_days: u32) -> Result<Enrollment, TrackerError> {
        let lock = self.lock_user(user)?;
        let _guard = lock
            .lock()
            .map_err(|_| TrackerError::StoreUnavailable("user lock poisoned".to_string()))?;
        let mut store = self.store()?;

        let profile = Self::profile(&store, user)?;
        let today = local_today(self.clock.now_utc(), profile.utc_offset_minutes);

        if let Some(mut prior) = store.active_enrollment(user)? {
            prior.abandon();
            store.save_enrollment(&prior)?;
            tracing::debug!(user = %user, enrollment = %prior.id, "prior challenge abandoned");
        }

        let enrollment = Enrollment::start(user.clone(), length_days, today)?;
        store.save_enrollment(&enrollment)?;
        tracing::debug!(user = %user, enrollment = %enrollment.id, length_days, "challenge started");
        Ok(enrollment)
    }

    /// Abandons the user's active challenge, if any. Idempotent.
    pub fn abandon(&self, user: &UserId) -> Result<Option<Enrollment>, TrackerError> {
        let lock = self.lock_user(user)?;
        let _guard = lock
            .lock()
            .map_err(|_| TrackerError::StoreUnavailable("user lock poisoned".to_string()))?;
        let mut store = self.store()?;

        Self::profile(&store, user)?;
        let Some(mut enrollment) = store.active_enrollment(user)? else {
            return Ok(None);
        };
        enrollment.abandon();
        store.save_enrollment(&enrollment)?;
        Ok(Some(enrollment))
    }

    fn summarize(
        store: &S,
        user: &UserId,
        today: NaiveDate,
    ) -> Result<StatsSnapshot, TrackerError> {
        let history = store.full_history(user)?;
        let streak = compute_streaks(&history, today);
        let challenge = store.enrollments(user)?.into_iter().next_back();
        Ok(StatsSnapshot { streak, challenge })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicI64, Ordering};

    use chrono::{DateTime, Utc};

    use crate::challenge::ChallengeStatus;
    use crate::store::MemoryStore;

    /// A clock tests can move forward day by day.
    struct TestClock(AtomicI64);

    impl TestClock {
        fn starting_at(instant: &str) -> Self {
            let instant: DateTime<Utc> = instant.parse().unwrap();
            Self(AtomicI64::new(instant.timestamp()))
        }

        fn advance_days(&self, days: i64) {
            self.0.fetch_add(days * 24 * 60 * 60, Ordering::SeqCst);
        }
    }

    impl Clock for &TestClock {
        fn now_utc(&self) -> DateTime<Utc> {
            DateTime::from_timestamp(self.0.load(Ordering::SeqCst), 0).unwrap()
        }
    }

    fn user() -> UserId {
        UserId::new("842901").unwrap()
    }

    fn tracker(clock: &TestClock) -> Tracker<MemoryStore, &TestClock> {
        let tracker = Tracker::new(MemoryStore::new(), clock);
        tracker.register_user(user(), Some("Sam".to_string()), 0).unwrap();
        tracker
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn stats_for_fresh_user_are_all_zero() {
        let clock = TestClock::starting_at("2025-03-01T12:00:00Z");
        let tracker = tracker(&clock);

        let stats = tracker.stats(&user()).unwrap();
        assert_eq!(stats.streak, StreakSnapshot::default());
        assert_eq!(stats.challenge, None);
    }

    #[test]
    fn operations_reject_unknown_users() {
        let clock = TestClock::starting_at("2025-03-01T12:00:00Z");
        let tracker = Tracker::new(MemoryStore::new(), &clock);
        let stranger = UserId::new("nobody").unwrap();

        assert_eq!(
            tracker.stats(&stranger),
            Err(TrackerError::UnknownUser(stranger.clone()))
        );
        assert_eq!(
            tracker.record_check_in(&stranger, true, None),
            Err(TrackerError::UnknownUser(stranger.clone()))
        );
        assert_eq!(
            tracker.enroll(&stranger, 5),
            Err(TrackerError::UnknownUser(stranger.clone()))
        );
        assert_eq!(
            tracker.abandon(&stranger),
            Err(TrackerError::UnknownUser(stranger))
        );
    }

    #[test]
    fn register_rejects_implausible_offsets() {
        let clock = TestClock::starting_at("2025-03-01T12:00:00Z");
        let tracker = Tracker::new(MemoryStore::new(), &clock);
        assert_eq!(
            tracker.register_user(user(), None, 15 * 60),
            Err(TrackerError::InvalidOffset(900))
        );
    }

    #[test]
    fn repeated_check_in_is_idempotent() {
        let clock = TestClock::starting_at("2025-03-01T12:00:00Z");
        let tracker = tracker(&clock);

        let first = tracker.record_check_in(&user(), true, None).unwrap();
        let second = tracker.record_check_in(&user(), true, None).unwrap();
        assert_eq!(first.stats, second.stats);
        assert_eq!(second.stats.streak.current, 1);
        assert_eq!(second.stats.streak.total_success_days, 1);
    }

    #[test]
    fn future_dated_check_in_is_rejected_without_a_record() {
        let clock = TestClock::starting_at("2025-03-01T12:00:00Z");
        let tracker = tracker(&clock);

        let result =
            tracker.record_check_in_on(&user(), date("2025-03-02"), true, None);
        assert_eq!(
            result,
            Err(TrackerError::FutureDate {
                date: date("2025-03-02"),
                today: date("2025-03-01"),
            })
        );

        let stats = tracker.stats(&user()).unwrap();
        assert_eq!(stats.streak.total_success_days, 0);
    }

    #[test]
    fn future_date_is_judged_in_the_users_day_boundary() {
        let clock = TestClock::starting_at("2025-03-01T23:30:00Z");
        let tracker = Tracker::new(MemoryStore::new(), &clock);
        // At UTC+6 the user is already on 2025-03-02.
        tracker.register_user(user(), None, 6 * 60).unwrap();

        let outcome = tracker
            .record_check_in_on(&user(), date("2025-03-02"), true, None)
            .unwrap();
        assert_eq!(outcome.check_in.date, date("2025-03-02"));
    }

    #[test]
    fn streak_builds_over_consecutive_days() {
        let clock = TestClock::starting_at("2025-03-01T12:00:00Z");
        let tracker = tracker(&clock);

        for _ in 0..3 {
            tracker.record_check_in(&user(), true, None).unwrap();
            clock.advance_days(1);
        }

        let stats = tracker.stats(&user()).unwrap();
        // Three successes through yesterday; today is still pending.
        assert_eq!(stats.streak.current, 3);
        assert_eq!(stats.streak.longest, 3);
    }

    #[test]
    fn five_day_challenge_completes_on_the_fifth_check_in() {
        let clock = TestClock::starting_at("2025-03-01T12:00:00Z");
        let tracker = tracker(&clock);
        tracker.enroll(&user(), 5).unwrap();

        for day in 1..=5 {
            let outcome = tracker.record_check_in(&user(), true, None).unwrap();
            if day < 5 {
                assert_eq!(outcome.challenge_event, ChallengeEvent::Advanced { day });
            } else {
                assert_eq!(outcome.challenge_event, ChallengeEvent::Completed);
            }
            clock.advance_days(1);
        }

        let challenge = tracker.stats(&user()).unwrap().challenge.unwrap();
        assert_eq!(challenge.status, ChallengeStatus::Completed);
        assert_eq!(challenge.current_day, 5);
    }

    #[test]
    fn relapse_fails_challenge_and_resets_streak() {
        let clock = TestClock::starting_at("2025-03-01T12:00:00Z");
        let tracker = tracker(&clock);
        tracker.enroll(&user(), 7).unwrap();

        tracker.record_check_in(&user(), true, None).unwrap();
        clock.advance_days(1);
        tracker.record_check_in(&user(), true, None).unwrap();
        clock.advance_days(1);
        let outcome = tracker.record_check_in(&user(), false, None).unwrap();

        assert_eq!(outcome.challenge_event, ChallengeEvent::Failed);
        assert_eq!(outcome.stats.streak.current, 0);
        assert_eq!(outcome.stats.streak.relapse_count, 1);
        let challenge = outcome.stats.challenge.unwrap();
        assert_eq!(challenge.status, ChallengeStatus::Failed);
        assert_eq!(challenge.current_day, 2);
    }

    #[test]
    fn enrolling_replaces_the_active_challenge() {
        let clock = TestClock::starting_at("2025-03-01T12:00:00Z");
        let tracker = tracker(&clock);

        let first = tracker.enroll(&user(), 7).unwrap();
        tracker.record_check_in(&user(), true, None).unwrap();
        let second = tracker.enroll(&user(), 14).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.current_day, 0);
        assert_eq!(second.status, ChallengeStatus::Active);

        let store = tracker.into_store();
        let all = store.enrollments(&user()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].status, ChallengeStatus::Abandoned);
        assert_eq!(all[1].status, ChallengeStatus::Active);
    }

    #[test]
    fn abandon_is_idempotent_and_reports_absence() {
        let clock = TestClock::starting_at("2025-03-01T12:00:00Z");
        let tracker = tracker(&clock);

        assert_eq!(tracker.abandon(&user()).unwrap(), None);
        tracker.enroll(&user(), 5).unwrap();
        let abandoned = tracker.abandon(&user()).unwrap().unwrap();
        assert_eq!(abandoned.status, ChallengeStatus::Abandoned);
        assert_eq!(tracker.abandon(&user()).unwrap(), None);
    }

    #[test]
    fn enroll_rejects_zero_length() {
        let clock = TestClock::starting_at("2025-03-01T12:00:00Z");
        let tracker = tracker(&clock);
        assert_eq!(
            tracker.enroll(&user(), 0),
            Err(TrackerError::InvalidLength(ChallengeError::InvalidLength {
                days: 0
            }))
        );
    }

    #[test]
    fn backfilled_check_in_does_not_move_the_challenge() {
        let clock = TestClock::starting_at("2025-03-05T12:00:00Z");
        let tracker = tracker(&clock);
        tracker.enroll(&user(), 5).unwrap();

        let outcome = tracker
            .record_check_in_on(&user(), date("2025-03-03"), true, None)
            .unwrap();
        assert_eq!(outcome.challenge_event, ChallengeEvent::NoChange);
        let challenge = outcome.stats.challenge.unwrap();
        assert_eq!(challenge.current_day, 0);
    }

    #[test]
    fn overwriting_success_with_relapse_fails_the_challenge() {
        let clock = TestClock::starting_at("2025-03-01T12:00:00Z");
        let tracker = tracker(&clock);
        tracker.enroll(&user(), 5).unwrap();

        tracker.record_check_in(&user(), true, None).unwrap();
        let outcome = tracker.record_check_in(&user(), false, None).unwrap();
        assert_eq!(outcome.challenge_event, ChallengeEvent::Failed);
        assert_eq!(outcome.stats.streak.current, 0);
    }
}
