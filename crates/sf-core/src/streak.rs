//! Streak calculation over check-in history.
//!
//! All functions here are pure: they take an ordered history and a reference
//! date, and derive streak figures without touching the store. Snapshots are
//! recomputed on demand and never persisted, so there is no cache to
//! invalidate; the cost is bounded by the length of the user's history.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::checkin::DailyRecord;

/// Derived streak figures for a single user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSnapshot {
    /// Length of the run of consecutive successful days ending at (or just
    /// before) the reference date.
    pub current: u32,
    /// Longest run of consecutive successful days anywhere in history.
    pub longest: u32,
    /// Total number of successful check-ins.
    pub total_success_days: u32,
    /// Total number of check-ins explicitly marked unsuccessful.
    pub relapse_count: u32,
}

/// Computes a [`StreakSnapshot`] from a check-in history.
///
/// `history` must be ordered ascending by date with at most one record per
/// date (the store guarantees both). `today` is the user's current calendar
/// date.
///
/// The current streak is anchored at `today`, or at the day before when no
/// record exists for `today` yet: a streak is pending, not broken, until the
/// day boundary passes. A missing calendar day breaks the streak; so does a
/// record with `success = false`, though only the latter counts as a relapse.
pub fn compute_streaks<R: DailyRecord>(history: &[R], today: NaiveDate) -> StreakSnapshot {
    let mut snapshot = StreakSnapshot {
        current: current_streak(history, today),
        ..StreakSnapshot::default()
    };

    let mut run: u32 = 0;
    let mut prev_date: Option<NaiveDate> = None;
    for record in history {
        if record.success() {
            let contiguous = prev_date
                .is_some_and(|prev| record.date() - prev == Duration::days(1));
            run = if contiguous { run + 1 } else { 1 };
            snapshot.total_success_days += 1;
            snapshot.longest = snapshot.longest.max(run);
        } else {
            run = 0;
            snapshot.relapse_count += 1;
        }
        prev_date = Some(record.date());
    }

    snapshot
}

/// Walks backward from the most recent record to count the current streak.
fn current_streak<R: DailyRecord>(history: &[R], today: NaiveDate) -> u32 {
    let Some(last) = history.last() else {
        return 0;
    };

    // The streak must reach today, or yesterday when today has no entry yet.
    let yesterday = today - Duration::days(1);
    if last.date() != today && last.date() != yesterday {
        return 0;
    }

    let mut streak = 0;
    let mut expected = last.date();
    for record in history.iter().rev() {
        if record.date() != expected || !record.success() {
            break;
        }
        streak += 1;
        expected -= Duration::days(1);
    }
    streak
}
