//! Note commands for free-text progress notes.

use std::io::Write;

use anyhow::{Result, bail};

use sf_db::Database;

use super::util;

pub fn add<W: Write>(writer: &mut W, db: &mut Database, user: &str, text: &str) -> Result<()> {
    let user = util::parse_user(user)?;
    let text = text.trim();
    if text.is_empty() {
        bail!("note cannot be empty");
    }
    if db.get_user_row(&user)?.is_none() {
        bail!("unknown user: {user}");
    }

    db.add_note(&user, text)?;
    writeln!(writer, "Note saved.")?;
    Ok(())
}

pub fn list<W: Write>(writer: &mut W, db: &Database, user: &str, limit: usize) -> Result<()> {
    let user = util::parse_user(user)?;
    if db.get_user_row(&user)?.is_none() {
        bail!("unknown user: {user}");
    }

    let notes = db.recent_notes(&user, limit)?;
    if notes.is_empty() {
        writeln!(writer, "No notes yet.")?;
        return Ok(());
    }
    for note in notes {
        writeln!(writer, "{}  {}", note.created_at, note.content)?;
    }
    Ok(())
}
