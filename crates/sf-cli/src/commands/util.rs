//! Shared utilities for CLI commands.

use anyhow::{Context, Result};

use sf_core::{ChallengeStatus, Enrollment, UserId};

/// Parses a transport-supplied user identifier.
pub fn parse_user(id: &str) -> Result<UserId> {
    UserId::new(id).context("invalid user ID")
}

/// One-line description of an enrollment for human-readable output.
pub fn describe_enrollment(enrollment: &Enrollment) -> String {
    match enrollment.status {
        ChallengeStatus::Active => format!(
            "day {} of {} (started {}, {} to go)",
            enrollment.current_day,
            enrollment.length_days,
            enrollment.start_date,
            plural_days(enrollment.days_remaining()),
        ),
        ChallengeStatus::Completed => format!(
            "completed, {} (started {})",
            plural_days(enrollment.length_days),
            enrollment.start_date,
        ),
        ChallengeStatus::Failed => format!(
            "failed after {} (started {})",
            plural_days(enrollment.current_day),
            enrollment.start_date,
        ),
        ChallengeStatus::Abandoned => format!(
            "abandoned after {} (started {})",
            plural_days(enrollment.current_day),
            enrollment.start_date,
        ),
    }
}

pub fn plural_days(days: u32) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}
