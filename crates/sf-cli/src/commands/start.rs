//! Start command for registering users.

use std::io::Write;

use anyhow::Result;

use sf_core::{CheckInStore, Clock, EnrollmentStore, Tracker};

use super::util;

pub fn run<W, S, C>(
    writer: &mut W,
    tracker: &Tracker<S, C>,
    user: &str,
    name: Option<String>,
    utc_offset: i32,
) -> Result<()>
where
    W: Write,
    S: CheckInStore + EnrollmentStore,
    C: Clock,
{
    let user = util::parse_user(user)?;
    let profile = tracker.register_user(user, name, utc_offset)?;

    match &profile.display_name {
        Some(name) => writeln!(writer, "Welcome, {name}! You are registered.")?,
        None => writeln!(writer, "Welcome! You are registered.")?,
    }
    writeln!(
        writer,
        "Record today's result with: sf checkin --user {} --success",
        profile.id
    )?;
    Ok(())
}
