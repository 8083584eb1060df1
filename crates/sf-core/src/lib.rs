//! Core domain logic for the sugar-free habit tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Check-ins: one success/slip record per user per calendar day
//! - Streaks: pure calculation of current/longest streaks and relapse counts
//! - Challenges: the fixed-length challenge state machine
//! - The [`Tracker`] engine that composes them over a pluggable store

pub mod challenge;
pub mod checkin;
pub mod clock;
pub mod motivation;
pub mod store;
pub mod streak;
mod tracker;
pub mod types;

pub use challenge::{ChallengeError, ChallengeEvent, ChallengeStatus, Enrollment};
pub use checkin::{CheckIn, DailyRecord};
pub use clock::{Clock, FixedClock, SystemClock, local_today};
pub use store::{CheckInStore, EnrollmentStore, MemoryStore, StoreError, UserProfile};
pub use streak::{StreakSnapshot, compute_streaks};
pub use tracker::{CheckInOutcome, StatsSnapshot, Tracker, TrackerError};
pub use types::{UserId, ValidationError};
