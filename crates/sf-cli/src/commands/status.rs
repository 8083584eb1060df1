//! Status command for showing recent check-ins per user.

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use sf_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    let users = db.last_check_in_by_user()?;

    writeln!(writer, "Habit tracker status")?;
    writeln!(writer, "Database: {}", database_path.display())?;

    if users.is_empty() {
        writeln!(writer, "No check-ins recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Users:")?;
    for user in users {
        match user.display_name {
            Some(name) => writeln!(
                writer,
                "- {} ({}): last check-in {}",
                user.user_id, name, user.last_check_in
            )?,
            None => writeln!(
                writer,
                "- {}: last check-in {}",
                user.user_id, user.last_check_in
            )?,
        }
    }

    Ok(())
}
