//! Stats command: the read-only summary path.

use std::io::Write;

use anyhow::Result;

use sf_core::{CheckInStore, Clock, EnrollmentStore, StatsSnapshot, Tracker, UserId};

use super::util;

pub fn run<W, S, C>(writer: &mut W, tracker: &Tracker<S, C>, user: &str, json: bool) -> Result<()>
where
    W: Write,
    S: CheckInStore + EnrollmentStore,
    C: Clock,
{
    let user = util::parse_user(user)?;
    let stats = tracker.stats(&user)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&stats)?)?;
    } else {
        render(writer, &user, &stats)?;
    }
    Ok(())
}

fn render<W: Write>(writer: &mut W, user: &UserId, stats: &StatsSnapshot) -> Result<()> {
    let streak = &stats.streak;
    writeln!(writer, "Stats for {user}")?;
    writeln!(writer, "Current streak: {}", util::plural_days(streak.current))?;
    writeln!(writer, "Longest streak: {}", util::plural_days(streak.longest))?;
    writeln!(writer, "Sugar-free days: {}", streak.total_success_days)?;
    writeln!(writer, "Slip-ups: {}", streak.relapse_count)?;

    let total = streak.total_success_days + streak.relapse_count;
    if total > 0 {
        let rate = streak.total_success_days * 100 / total;
        writeln!(writer, "Success rate: {rate}%")?;
    }

    match &stats.challenge {
        Some(enrollment) => {
            writeln!(writer, "Challenge: {}", util::describe_enrollment(enrollment))?;
        }
        None => writeln!(writer, "Challenge: none")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, NaiveDate};
    use insta::assert_snapshot;
    use sf_core::{FixedClock, MemoryStore};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn tracker() -> Tracker<MemoryStore, FixedClock> {
        let clock = FixedClock::new(
            DateTime::parse_from_rfc3339("2025-03-05T12:00:00Z")
                .unwrap()
                .to_utc(),
        );
        let tracker = Tracker::new(MemoryStore::new(), clock);
        tracker
            .register_user(UserId::new("842901").unwrap(), Some("Sam".to_string()), 0)
            .unwrap();
        tracker
    }

    #[test]
    fn stats_for_fresh_user() {
        let tracker = tracker();
        let mut output = Vec::new();

        run(&mut output, &tracker, "842901", false).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Stats for 842901
        Current streak: 0 days
        Longest streak: 0 days
        Sugar-free days: 0
        Slip-ups: 0
        Challenge: none
        ");
    }

    #[test]
    fn stats_with_history_and_rate() {
        let tracker = tracker();
        let user = UserId::new("842901").unwrap();
        tracker
            .record_check_in_on(&user, date("2025-03-02"), false, None)
            .unwrap();
        tracker
            .record_check_in_on(&user, date("2025-03-03"), true, None)
            .unwrap();
        tracker
            .record_check_in_on(&user, date("2025-03-04"), true, None)
            .unwrap();
        let mut output = Vec::new();

        run(&mut output, &tracker, "842901", false).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Stats for 842901
        Current streak: 2 days
        Longest streak: 2 days
        Sugar-free days: 2
        Slip-ups: 1
        Success rate: 66%
        Challenge: none
        ");
    }

    #[test]
    fn stats_as_json() {
        let tracker = tracker();
        let user = UserId::new("842901").unwrap();
        tracker.record_check_in(&user, true, None).unwrap();
        let mut output = Vec::new();

        run(&mut output, &tracker, "842901", true).unwrap();

        let output = String::from_utf8(output).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["streak"]["current"], 1);
        assert_eq!(value["streak"]["total_success_days"], 1);
        assert!(value["challenge"].is_null());
    }

    #[test]
    fn stats_reports_challenge_line() {
        let tracker = tracker();
        let user = UserId::new("842901").unwrap();
        tracker.enroll(&user, 7).unwrap();
        let mut output = Vec::new();

        run(&mut output, &tracker, "842901", false).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Challenge: day 0 of 7 (started 2025-03-05, 7 days to go)"));
    }
}
