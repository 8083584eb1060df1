//! Check-in command: record today's result and show the updated summary.

use std::io::Write;

use anyhow::Result;

use sf_core::{
    ChallengeEvent, CheckInOutcome, CheckInStore, Clock, EnrollmentStore, Tracker, motivation,
};

use super::util;

pub fn run<W, S, C>(
    writer: &mut W,
    tracker: &Tracker<S, C>,
    user: &str,
    success: bool,
    note: Option<String>,
) -> Result<()>
where
    W: Write,
    S: CheckInStore + EnrollmentStore,
    C: Clock,
{
    let user = util::parse_user(user)?;
    let outcome = tracker.record_check_in(&user, success, note)?;
    render(writer, &outcome)
}

fn render<W: Write>(writer: &mut W, outcome: &CheckInOutcome) -> Result<()> {
    let streak = &outcome.stats.streak;

    if outcome.check_in.success {
        writeln!(writer, "Checked in for {}: sugar-free", outcome.check_in.date)?;
        writeln!(writer, "{}", motivation::success_message(streak.current))?;
    } else {
        writeln!(writer, "Checked in for {}: slip-up", outcome.check_in.date)?;
        writeln!(writer, "{}", motivation::slip_up_message(streak.relapse_count))?;
    }
    writeln!(
        writer,
        "Current streak: {} (longest {})",
        util::plural_days(streak.current),
        util::plural_days(streak.longest),
    )?;

    match (outcome.challenge_event, &outcome.stats.challenge) {
        (ChallengeEvent::Completed, Some(enrollment)) => {
            writeln!(
                writer,
                "{}",
                motivation::challenge_completed_message(enrollment.length_days)
            )?;
        }
        (ChallengeEvent::Failed, Some(enrollment)) => {
            writeln!(
                writer,
                "Challenge failed after {}. Start a new one whenever you are ready.",
                util::plural_days(enrollment.current_day),
            )?;
        }
        (ChallengeEvent::Advanced { .. } | ChallengeEvent::NoChange, Some(enrollment))
            if enrollment.is_active() =>
        {
            writeln!(writer, "Challenge: {}", util::describe_enrollment(enrollment))?;
        }
        _ => {}
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
            .register_user(UserId::new("842901").unwrap(), Some("Sam".to_string()), 0)
            .unwrap();
        tracker
    }

    #[test]
    fn success_check_in_reports_streak() {
        let tracker = tracker();
        let mut output = Vec::new();

        run(&mut output, &tracker, "842901", true, None).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        Checked in for 2025-03-05: sugar-free
        Your willpower is showing. Keep it up!
        Current streak: 1 day (longest 1 day)
        ");
    }

    #[test]
    fn slip_check_in_is_supportive() {
        let tracker = tracker();
        let mut output = Vec::new();

        run(&mut output, &tracker, "842901", false, Some("party".to_string())).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Checked in for 2025-03-05: slip-up"));
        assert!(output.contains("Current streak: 0 days"));
    }

    #[test]
    fn check_in_reports_challenge_progress() {
        let tracker = tracker();
        tracker.enroll(&UserId::new("842901").unwrap(), 7).unwrap();
        let mut output = Vec::new();

        run(&mut output, &tracker, "842901", true, None).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Challenge: day 1 of 7"));
    }

    #[test]
    fn completing_the_challenge_is_celebrated() {
        let tracker = tracker();
        tracker.enroll(&UserId::new("842901").unwrap(), 1).unwrap();
        let mut output = Vec::new();

        run(&mut output, &tracker, "842901", true, None).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Challenge complete: 1 days without sugar"));
    }

    #[test]
    fn relapse_fails_the_challenge() {
        let tracker = tracker();
        tracker.enroll(&UserId::new("842901").unwrap(), 7).unwrap();
        let mut output = Vec::new();

        run(&mut output, &tracker, "842901", false, None).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Challenge failed after 0 days"));
    }

    #[test]
    fn unknown_user_is_an_error() {
        let tracker = tracker();
        let mut output = Vec::new();
        let err = run(&mut output, &tracker, "nobody", true, None).unwrap_err();
        assert!(err.to_string().contains("unknown user"));
    }
}
