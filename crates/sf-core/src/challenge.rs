//! Fixed-length challenge state machine.
//!
//! A challenge is an opt-in commitment to a fixed number of sugar-free days.
//! Each enrollment moves through `active → completed | failed | abandoned`;
//! terminal states absorb all further events. Progress advances at most once
//! per calendar day, and a single relapse while active fails the challenge.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{UserId, ValidationError};

/// Challenge configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    /// The requested challenge length was not a positive number of days.
    #[error("challenge length must be at least one day, got {days}")]
    InvalidLength { days: u32 },
}

/// Lifecycle state of a challenge enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    /// The user is working through the challenge.
    Active,
    /// Every day of the challenge was completed successfully.
    Completed,
    /// A relapse was recorded while the challenge was active.
    Failed,
    /// The user gave the challenge up, or replaced it with a new one.
    Abandoned,
}

impl ChallengeStatus {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
        }
    }

    /// Whether this status accepts further transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChallengeStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "abandoned" => Ok(Self::Abandoned),
            _ => Err(ValidationError::InvalidChallengeStatus {
                value: s.to_string(),
            }),
        }
    }
}

/// What happened to an enrollment when a check-in was applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeEvent {
    /// The enrollment advanced by one day.
    Advanced { day: u32 },
    /// The final day was reached; the challenge is complete.
    Completed,
    /// A relapse ended the challenge.
    Failed,
    /// The enrollment was abandoned.
    Abandoned,
    /// Nothing changed (terminal enrollment, or already advanced today).
    NoChange,
}

/// A user's enrollment in a fixed-length challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Unique identifier for this enrollment.
    pub id: String,
    /// The enrolled user.
    pub user: UserId,
    /// Committed length in days.
    pub length_days: u32,
    /// The user-local date the enrollment was created.
    pub start_date: NaiveDate,
    /// Number of successfully completed days so far.
    pub current_day: u32,
    /// Lifecycle state.
    pub status: ChallengeStatus,
    /// The last date a successful check-in advanced this enrollment.
    /// Guards against double-advancing when a check-in is re-recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_progress_date: Option<NaiveDate>,
}

impl Enrollment {
    /// Starts a new active enrollment.
    pub fn start(
        user: UserId,
        length_days: u32,
        start_date: NaiveDate,
    ) -> Result<Self, ChallengeError> {
        if length_days == 0 {
            return Err(ChallengeError::InvalidLength { days: length_days });
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user,
            length_days,
            start_date,
            current_day: 0,
            status: ChallengeStatus::Active,
            last_progress_date: None,
        })
    }

    /// Whether the enrollment still accepts check-in events.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, ChallengeStatus::Active)
    }

    /// Days left until completion. Zero for terminal enrollments.
    #[must_use]
    pub const fn days_remaining(&self) -> u32 {
        if self.is_active() {
            self.length_days.saturating_sub(self.current_day)
        } else {
            0
        }
    }

    /// Applies a check-in for `date` to this enrollment.
    ///
    /// A success advances `current_day` once per calendar day and completes
    /// the challenge when the committed length is reached. A relapse fails an
    /// active challenge. Terminal enrollments are left untouched.
    pub fn apply_check_in(&mut self, date: NaiveDate, success: bool) -> ChallengeEvent {
        if !self.is_active() {
            return ChallengeEvent::NoChange;
        }

        if !success {
            self.status = ChallengeStatus::Failed;
            tracing::debug!(enrollment = %self.id, "challenge failed after relapse");
            return ChallengeEvent::Failed;
        }

        if self.last_progress_date == Some(date) {
            return ChallengeEvent::NoChange;
        }

        self.current_day += 1;
        self.last_progress_date = Some(date);
        if self.current_day >= self.length_days {
            self.status = ChallengeStatus::Completed;
            tracing::debug!(enrollment = %self.id, days = self.length_days, "challenge completed");
            return ChallengeEvent::Completed;
        }
        ChallengeEvent::Advanced {
            day: self.current_day,
        }
    }

    /// Abandons an active enrollment. No-op on terminal enrollments.
    pub fn abandon(&mut self) -> ChallengeEvent {
        if !self.is_active() {
            return ChallengeEvent::NoChange;
        }
        self.status = ChallengeStatus::Abandoned;
        ChallengeEvent::Abandoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn user() -> UserId {
        UserId::new("842901").unwrap()
    }

    fn enrollment(length_days: u32) -> Enrollment {
        Enrollment::start(user(), length_days, date("2025-03-01")).unwrap()
    }

    #[test]
    fn start_rejects_zero_length() {
        let result = Enrollment::start(user(), 0, date("2025-03-01"));
        assert_eq!(result, Err(ChallengeError::InvalidLength { days: 0 }));
    }

    #[test]
    fn start_creates_active_enrollment_at_day_zero() {
        let enrollment = enrollment(5);
        assert_eq!(enrollment.status, ChallengeStatus::Active);
        assert_eq!(enrollment.current_day, 0);
        assert_eq!(enrollment.days_remaining(), 5);
    }

    #[test]
    fn five_consecutive_successes_complete_a_five_day_challenge() {
        let mut enrollment = enrollment(5);
        for day in 1..=4 {
            let event = enrollment.apply_check_in(date("2025-03-01") + chrono::Duration::days(day - 1), true);
            assert_eq!(event, ChallengeEvent::Advanced { day: day as u32 });
        }
        let event = enrollment.apply_check_in(date("2025-03-05"), true);
        assert_eq!(event, ChallengeEvent::Completed);
        assert_eq!(enrollment.status, ChallengeStatus::Completed);
        assert_eq!(enrollment.current_day, 5);
    }

    #[test]
    fn relapse_fails_an_active_challenge() {
        let mut enrollment = enrollment(7);
        enrollment.apply_check_in(date("2025-03-01"), true);
        enrollment.apply_check_in(date("2025-03-02"), true);
        let event = enrollment.apply_check_in(date("2025-03-03"), false);
        assert_eq!(event, ChallengeEvent::Failed);
        assert_eq!(enrollment.status, ChallengeStatus::Failed);
        assert_eq!(enrollment.current_day, 2);
    }

    #[test]
    fn same_day_success_advances_only_once() {
        let mut enrollment = enrollment(5);
        assert_eq!(
            enrollment.apply_check_in(date("2025-03-01"), true),
            ChallengeEvent::Advanced { day: 1 }
        );
        assert_eq!(
            enrollment.apply_check_in(date("2025-03-01"), true),
            ChallengeEvent::NoChange
        );
        assert_eq!(enrollment.current_day, 1);
    }

    #[test]
    fn current_day_never_exceeds_length() {
        let mut enrollment = enrollment(2);
        enrollment.apply_check_in(date("2025-03-01"), true);
        enrollment.apply_check_in(date("2025-03-02"), true);
        assert_eq!(enrollment.status, ChallengeStatus::Completed);

        // Further check-ins hit a terminal enrollment and change nothing.
        assert_eq!(
            enrollment.apply_check_in(date("2025-03-03"), true),
            ChallengeEvent::NoChange
        );
        assert_eq!(enrollment.current_day, 2);
    }

    #[test]
    fn abandon_is_idempotent() {
        let mut enrollment = enrollment(5);
        assert_eq!(enrollment.abandon(), ChallengeEvent::Abandoned);
        assert_eq!(enrollment.status, ChallengeStatus::Abandoned);
        assert_eq!(enrollment.abandon(), ChallengeEvent::NoChange);
    }

    #[test]
    fn terminal_enrollments_ignore_relapses() {
        let mut enrollment = enrollment(3);
        enrollment.abandon();
        assert_eq!(
            enrollment.apply_check_in(date("2025-03-01"), false),
            ChallengeEvent::NoChange
        );
        assert_eq!(enrollment.status, ChallengeStatus::Abandoned);
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            ChallengeStatus::Active,
            ChallengeStatus::Completed,
            ChallengeStatus::Failed,
            ChallengeStatus::Abandoned,
        ] {
            assert_eq!(status.as_str().parse::<ChallengeStatus>().unwrap(), status);
        }
        assert!("paused".parse::<ChallengeStatus>().is_err());
    }
}
