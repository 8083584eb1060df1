//! Daily check-in records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// A user-submitted daily record of whether they stayed sugar-free.
///
/// At most one check-in exists per (user, date); re-recording the same date
/// overwrites the success flag and note rather than creating a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    /// Who checked in.
    pub user: UserId,
    /// The calendar date this check-in covers, in the user's day boundary.
    pub date: NaiveDate,
    /// Whether the user held out (`true`) or slipped up (`false`).
    pub success: bool,
    /// Optional free-text note attached to the check-in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A dated success/failure record suitable for streak calculation.
///
/// This trait lets the streak calculator work with different record
/// representations (e.g., full [`CheckIn`] values from the store, or compact
/// test fixtures).
pub trait DailyRecord {
    /// The calendar date of the record.
    fn date(&self) -> NaiveDate;

    /// Whether the day was a success.
    fn success(&self) -> bool;
}

impl DailyRecord for CheckIn {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn success(&self) -> bool {
        self.success
    }
}

impl DailyRecord for (NaiveDate, bool) {
    fn date(&self) -> NaiveDate {
        self.0
    }

    fn success(&self) -> bool {
        self.1
    }
}
