//! Challenge commands: start, status, abandon.

use std::io::Write;

use anyhow::Result;

use sf_core::{CheckInStore, Clock, EnrollmentStore, Tracker};

use super::util;

pub fn start<W, S, C>(writer: &mut W, tracker: &Tracker<S, C>, user: &str, days: u32) -> Result<()>
where
    W: Write,
    S: CheckInStore + EnrollmentStore,
    C: Clock,
{
    let user = util::parse_user(user)?;
    let had_active = tracker
        .stats(&user)?
        .challenge
        .is_some_and(|e| e.is_active());
    let enrollment = tracker.enroll(&user, days)?;

    if had_active {
        writeln!(writer, "Previous challenge abandoned.")?;
    }
    writeln!(
        writer,
        "Started a {}-day challenge. Check in every day to complete it.",
        enrollment.length_days,
    )?;
    Ok(())
}

pub fn status<W, S, C>(writer: &mut W, tracker: &Tracker<S, C>, user: &str) -> Result<()>
where
    W: Write,
    S: CheckInStore + EnrollmentStore,
    C: Clock,
{
    let user = util::parse_user(user)?;
    match tracker.stats(&user)?.challenge {
        Some(enrollment) => {
            writeln!(writer, "Challenge: {}", util::describe_enrollment(&enrollment))?;
        }
        None => writeln!(writer, "No challenge yet. Start one with: sf challenge start")?,
    }
    Ok(())
}

pub fn abandon<W, S, C>(writer: &mut W, tracker: &Tracker<S, C>, user: &str) -> Result<()>
where
    W: Write,
    S: CheckInStore + EnrollmentStore,
    C: Clock,
{
    let user = util::parse_user(user)?;
    match tracker.abandon(&user)? {
        Some(enrollment) => writeln!(
            writer,
            "Challenge abandoned after {}.",
            util::plural_days(enrollment.current_day),
        )?,
        None => writeln!(writer, "No active challenge.")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::DateTime;
    use insta::assert_snapshot;
    use sf_core::{FixedClock, MemoryStore, UserId};

    fn tracker() -> Tracker<MemoryStore, FixedClock> {
        let clock = FixedClock::new(
            DateTime::parse_from_rfc3339("2025-03-05T12:00:00Z")
                .unwrap()
                .to_utc(),
        );
        let tracker = Tracker::new(MemoryStore::new(), clock);
        tracker
            .register_user(UserId::new("842901").unwrap(), None, 0)
            .unwrap();
        tracker
    }

    #[test]
    fn start_then_status_then_abandon() {
        let tracker = tracker();
        let mut output = Vec::new();

        start(&mut output, &tracker, "842901", 7).unwrap();
        status(&mut output, &tracker, "842901").unwrap();
        abandon(&mut output, &tracker, "842901").unwrap();
        abandon(&mut output, &tracker, "842901").unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Started a 7-day challenge. Check in every day to complete it.
        Challenge: day 0 of 7 (started 2025-03-05, 7 days to go)
        Challenge abandoned after 0 days.
        No active challenge.
        ");
    }

    #[test]
    fn restarting_reports_replacement() {
        let tracker = tracker();
        let mut output = Vec::new();
        start(&mut output, &tracker, "842901", 7).unwrap();

        let mut output = Vec::new();
        start(&mut output, &tracker, "842901", 14).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Previous challenge abandoned."));
        assert!(output.contains("Started a 14-day challenge."));
    }

    #[test]
    fn zero_length_challenge_is_rejected() {
        let tracker = tracker();
        let mut output = Vec::new();
        let err = start(&mut output, &tracker, "842901", 0).unwrap_err();
        assert!(err.to_string().contains("at least one day"));
    }

    #[test]
    fn status_without_challenge() {
        let tracker = tracker();
        let mut output = Vec::new();
        status(&mut output, &tracker, "842901").unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("No challenge yet"));
    }
}
