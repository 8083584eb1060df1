//! Storage seams for check-ins, users, and enrollments.
//!
//! The tracker talks to persistence through these traits so the engine can be
//! exercised against the in-memory [`MemoryStore`] in tests while production
//! uses the SQLite implementation in `sf-db`.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::challenge::Enrollment;
use crate::checkin::CheckIn;
use crate::types::UserId;

/// Storage errors.
///
/// `Unavailable` covers transient infrastructure failures; callers decide
/// whether to retry. The engine never retries internally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The user identifier is not registered.
    #[error("unknown user: {0}")]
    UnknownUser(UserId),
    /// The backing store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Opaque, stable identifier from the transport layer.
    pub id: UserId,
    /// Optional human-readable name.
    pub display_name: Option<String>,
    /// Day-boundary offset in minutes east of UTC.
    pub utc_offset_minutes: i32,
    /// Soft-retention flag; users are never deleted.
    pub is_active: bool,
    /// When the user first interacted with the tracker.
    pub created_at: DateTime<Utc>,
}

/// Durable record of daily check-ins, one per (user, date).
pub trait CheckInStore {
    /// Registers a user, or refreshes the profile of an existing one.
    fn upsert_user(&mut self, profile: &UserProfile) -> Result<(), StoreError>;

    /// Looks up a registered user.
    fn get_user(&self, user: &UserId) -> Result<Option<UserProfile>, StoreError>;

    /// Records a check-in, overwriting any existing record for the same
    /// (user, date). The write is idempotent.
    fn record_check_in(&mut self, check_in: &CheckIn) -> Result<(), StoreError>;

    /// Returns check-ins in `[from, to]` ordered ascending by date.
    /// An empty range yields an empty sequence, never an error.
    fn history(
        &self,
        user: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CheckIn>, StoreError>;

    /// Returns the user's entire check-in history, ascending by date.
    fn full_history(&self, user: &UserId) -> Result<Vec<CheckIn>, StoreError>;

    /// Returns the most recent check-in, if any.
    fn last_check_in(&self, user: &UserId) -> Result<Option<CheckIn>, StoreError>;
}

/// Durable record of challenge enrollments.
pub trait EnrollmentStore {
    /// Returns the user's active enrollment, if any.
    fn active_enrollment(&self, user: &UserId) -> Result<Option<Enrollment>, StoreError>;

    /// Inserts or updates an enrollment by ID.
    fn save_enrollment(&mut self, enrollment: &Enrollment) -> Result<(), StoreError>;

    /// Returns all of the user's enrollments, oldest first.
    fn enrollments(&self, user: &UserId) -> Result<Vec<Enrollment>, StoreError>;
}

/// In-memory reference store.
///
/// Keeps the same semantics as the SQLite implementation (unique check-in per
/// date, upsert on conflict) and backs the engine's unit tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: HashMap<UserId, UserProfile>,
    check_ins: HashMap<UserId, BTreeMap<NaiveDate, CheckIn>>,
    enrollments: HashMap<UserId, Vec<Enrollment>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn require_user(&self, user: &UserId) -> Result<(), StoreError> {
        if self.users.contains_key(user) {
            Ok(())
        } else {
            Err(StoreError::UnknownUser(user.clone()))
        }
    }
}

impl CheckInStore for MemoryStore {
    fn upsert_user(&mut self, profile: &UserProfile) -> Result<(), StoreError> {
        self.users.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    fn get_user(&self, user: &UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.users.get(user).cloned())
    }

    fn record_check_in(&mut self, check_in: &CheckIn) -> Result<(), StoreError> {
        self.require_user(&check_in.user)?;
        self.check_ins
            .entry(check_in.user.clone())
            .or_default()
            .insert(check_in.date, check_in.clone());
        Ok(())
    }

    fn history(
        &self,
        user: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CheckIn>, StoreError> {
        self.require_user(user)?;
        if to < from {
            return Ok(Vec::new());
        }
        Ok(self
            .check_ins
            .get(user)
            .map(|days| days.range(from..=to).map(|(_, c)| c.clone()).collect())
            .unwrap_or_default())
    }

    fn full_history(&self, user: &UserId) -> Result<Vec<CheckIn>, StoreError> {
        self.require_user(user)?;
        Ok(self
            .check_ins
            .get(user)
            .map(|days| days.values().cloned().collect())
            .unwrap_or_default())
    }

    fn last_check_in(&self, user: &UserId) -> Result<Option<CheckIn>, StoreError> {
        self.require_user(user)?;
        Ok(self
            .check_ins
            .get(user)
            .and_then(|days| days.values().next_back().cloned()))
    }
}

impl EnrollmentStore for MemoryStore {
    fn active_enrollment(&self, user: &UserId) -> Result<Option<Enrollment>, StoreError> {
        self.require_user(user)?;
        Ok(self
            .enrollments
            .get(user)
            .and_then(|all| all.iter().find(|e| e.is_active()).cloned()))
    }

    fn save_enrollment(&mut self, enrollment: &Enrollment) -> Result<(), StoreError> {
        self.require_user(&enrollment.user)?;
        let all = self.enrollments.entry(enrollment.user.clone()).or_default();
        match all.iter_mut().find(|e| e.id == enrollment.id) {
            Some(existing) => *existing = enrollment.clone(),
            None => all.push(enrollment.clone()),
        }
        Ok(())
    }

    fn enrollments(&self, user: &UserId) -> Result<Vec<Enrollment>, StoreError> {
        self.require_user(user)?;
        Ok(self.enrollments.get(user).cloned().unwrap_or_default())
    }
}
