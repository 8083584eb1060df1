//! Storage layer for the sugar-free habit tracker.
//!
//! Provides persistence for users, check-ins, challenge enrollments, notes,
//! and generated recipes using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. The engine in `sf-core` wraps the store in a `Mutex`, which is
//! exactly the discipline required here; standalone users of this crate must
//! do the same before sharing a `Database` across threads.
//!
//! # Schema
//!
//! Calendar dates are stored as TEXT in `YYYY-MM-DD` form and instants as
//! ISO 8601 TEXT (e.g., `2025-03-01T10:30:00Z`), so lexicographic ordering
//! matches chronological ordering and rows stay human-readable. Check-ins are
//! keyed by (user, date); re-recording a date is an upsert, never a duplicate
//! row.

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use uuid::Uuid;

use sf_core::{
    CheckIn, CheckInStore, Enrollment, EnrollmentStore, StoreError, UserId, UserProfile,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored calendar date.
    #[error("invalid date in {context}: {value}")]
    DateParse {
        context: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp in {context}: {value}")]
    TimestampParse {
        context: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored value failed domain validation.
    #[error("invalid stored value: {0}")]
    Invalid(#[from] sf_core::ValidationError),
}

/// A stored free-text progress note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
}

/// A stored generated recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeRecord {
    pub id: String,
    pub user_id: String,
    pub ingredients: String,
    pub recipe_text: String,
    pub created_at: String,
}

/// Latest check-in date per user, for the status overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLastCheckIn {
    pub user_id: String,
    pub display_name: Option<String>,
    pub last_check_in: String,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                display_name TEXT,
                utc_offset_minutes INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            -- Check-ins: one row per (user, date); writes are upserts
            -- check_date: 'YYYY-MM-DD', ordered lexicographically
            CREATE TABLE IF NOT EXISTS checkins (
                user_id TEXT NOT NULL,
                check_date TEXT NOT NULL,
                success INTEGER NOT NULL,
                note TEXT,
                recorded_at TEXT NOT NULL,
                PRIMARY KEY (user_id, check_date),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS enrollments (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                length_days INTEGER NOT NULL,
                start_date TEXT NOT NULL,
                current_day INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                last_progress_date TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_enrollments_user ON enrollments(user_id, created_at);

            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_notes_user ON notes(user_id, created_at);

            CREATE TABLE IF NOT EXISTS recipes (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                ingredients TEXT NOT NULL,
                recipe_text TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_recipes_user ON recipes(user_id, created_at);
            ",
        )?;
        Ok(())
    }

    // ========== Users ==========

    /// Inserts or updates a user profile.
    pub fn upsert_user_row(&mut self, profile: &UserProfile) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO users (id, display_name, utc_offset_minutes, is_active, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                utc_offset_minutes = excluded.utc_offset_minutes,
                is_active = excluded.is_active
            ",
            params![
                profile.id.as_str(),
                profile.display_name,
                profile.utc_offset_minutes,
                profile.is_active,
                format_timestamp(profile.created_at),
            ],
        )?;
        Ok(())
    }

    /// Looks up a user by ID.
    pub fn get_user_row(&self, user: &UserId) -> Result<Option<UserProfile>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, display_name, utc_offset_minutes, is_active, created_at
                FROM users
                WHERE id = ?
                ",
                params![user.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i32>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, display_name, utc_offset_minutes, is_active, created_at)) = row else {
            return Ok(None);
        };
        Ok(Some(UserProfile {
            id: UserId::new(id)?,
            display_name,
            utc_offset_minutes,
            is_active,
            created_at: parse_timestamp(&created_at, "users.created_at")?,
        }))
    }

    // ========== Check-ins ==========

    /// Upserts a check-in for (user, date).
    pub fn upsert_check_in(&mut self, check_in: &CheckIn) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO checkins (user_id, check_date, success, note, recorded_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, check_date) DO UPDATE SET
                success = excluded.success,
                note = excluded.note,
                recorded_at = excluded.recorded_at
            ",
            params![
                check_in.user.as_str(),
                format_date(check_in.date),
                check_in.success,
                check_in.note,
                format_timestamp(Utc::now()),
            ],
        )?;
        Ok(())
    }

    /// Lists check-ins in `[from, to]`, ascending by date.
    pub fn list_check_ins(
        &self,
        user: &UserId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<CheckIn>, DbError> {
        let from = from.map_or_else(|| "0000-00-00".to_string(), format_date);
        let to = to.map_or_else(|| "9999-99-99".to_string(), format_date);
        let mut stmt = self.conn.prepare(
            "
            SELECT user_id, check_date, success, note
            FROM checkins
            WHERE user_id = ? AND check_date >= ? AND check_date <= ?
            ORDER BY check_date ASC
            ",
        )?;
        let rows = stmt.query_map(params![user.as_str(), from, to], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let mut check_ins = Vec::new();
        for row in rows {
            let (user_id, check_date, success, note) = row?;
            check_ins.push(CheckIn {
                user: UserId::new(user_id)?,
                date: parse_date(&check_date, "checkins.check_date")?,
                success,
                note,
            });
        }
        Ok(check_ins)
    }

    /// Returns the most recent check-in for a user.
    pub fn latest_check_in(&self, user: &UserId) -> Result<Option<CheckIn>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT user_id, check_date, success, note
                FROM checkins
                WHERE user_id = ?
                ORDER BY check_date DESC
                LIMIT 1
                ",
                params![user.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, bool>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((user_id, check_date, success, note)) = row else {
            return Ok(None);
        };
        Ok(Some(CheckIn {
            user: UserId::new(user_id)?,
            date: parse_date(&check_date, "checkins.check_date")?,
            success,
            note,
        }))
    }

    /// Lists the last check-in date per user, most recent first.
    pub fn last_check_in_by_user(&self) -> Result<Vec<UserLastCheckIn>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT users.id, users.display_name, MAX(checkins.check_date) AS last_check_in
            FROM users
            JOIN checkins ON checkins.user_id = users.id
            GROUP BY users.id
            ORDER BY last_check_in DESC, users.id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(UserLastCheckIn {
                user_id: row.get(0)?,
                display_name: row.get(1)?,
                last_check_in: row.get(2)?,
            })
        })?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    // ========== Enrollments ==========

    /// Inserts or updates an enrollment by ID.
    pub fn upsert_enrollment(&mut self, enrollment: &Enrollment) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO enrollments
            (id, user_id, length_days, start_date, current_day, status, last_progress_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                current_day = excluded.current_day,
                status = excluded.status,
                last_progress_date = excluded.last_progress_date
            ",
            params![
                enrollment.id,
                enrollment.user.as_str(),
                enrollment.length_days,
                format_date(enrollment.start_date),
                enrollment.current_day,
                enrollment.status.as_str(),
                enrollment.last_progress_date.map(format_date),
                format_timestamp(Utc::now()),
            ],
        )?;
        Ok(())
    }

    /// Lists a user's enrollments, oldest first.
    pub fn list_enrollments(&self, user: &UserId) -> Result<Vec<Enrollment>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, user_id, length_days, start_date, current_day, status, last_progress_date
            FROM enrollments
            WHERE user_id = ?
            ORDER BY created_at ASC, rowid ASC
            ",
        )?;
        let rows = stmt.query_map(params![user.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;

        let mut enrollments = Vec::new();
        for row in rows {
            let (id, user_id, length_days, start_date, current_day, status, last_progress) = row?;
            enrollments.push(Enrollment {
                id,
                user: UserId::new(user_id)?,
                length_days,
                start_date: parse_date(&start_date, "enrollments.start_date")?,
                current_day,
                status: status.parse()?,
                last_progress_date: last_progress
                    .map(|date| parse_date(&date, "enrollments.last_progress_date"))
                    .transpose()?,
            });
        }
        Ok(enrollments)
    }

    // ========== Notes ==========

    /// Appends a progress note.
    pub fn add_note(&mut self, user: &UserId, content: &str) -> Result<NoteRecord, DbError> {
        let record = NoteRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user.as_str().to_string(),
            content: content.to_string(),
            created_at: format_timestamp(Utc::now()),
        };
        self.conn.execute(
            "INSERT INTO notes (id, user_id, content, created_at) VALUES (?, ?, ?, ?)",
            params![record.id, record.user_id, record.content, record.created_at],
        )?;
        tracing::debug!(user = %user, note = %record.id, "note added");
        Ok(record)
    }

    /// Lists a user's most recent notes, newest first.
    pub fn recent_notes(&self, user: &UserId, limit: usize) -> Result<Vec<NoteRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, user_id, content, created_at
            FROM notes
            WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            ",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![user.as_str(), limit], |row| {
            Ok(NoteRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                content: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        let mut notes = Vec::new();
        for row in rows {
            notes.push(row?);
        }
        Ok(notes)
    }

    // ========== Recipes ==========

    /// Stores a generated recipe.
    pub fn save_recipe(
        &mut self,
        user: &UserId,
        ingredients: &str,
        recipe_text: &str,
    ) -> Result<RecipeRecord, DbError> {
        let record = RecipeRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user.as_str().to_string(),
            ingredients: ingredients.to_string(),
            recipe_text: recipe_text.to_string(),
            created_at: format_timestamp(Utc::now()),
        };
        self.conn.execute(
            "
            INSERT INTO recipes (id, user_id, ingredients, recipe_text, created_at)
            VALUES (?, ?, ?, ?, ?)
            ",
            params![
                record.id,
                record.user_id,
                record.ingredients,
                record.recipe_text,
                record.created_at,
            ],
        )?;
        Ok(record)
    }

    /// Lists a user's most recent recipes, newest first.
    pub fn recent_recipes(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<RecipeRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, user_id, ingredients, recipe_text, created_at
            FROM recipes
            WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            ",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![user.as_str(), limit], |row| {
            Ok(RecipeRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                ingredients: row.get(2)?,
                recipe_text: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        let mut recipes = Vec::new();
        for row in rows {
            recipes.push(row?);
        }
        Ok(recipes)
    }

    fn require_user(&self, user: &UserId) -> Result<(), StoreError> {
        match self.get_user_row(user) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(StoreError::UnknownUser(user.clone())),
            Err(err) => Err(into_store_error(&err)),
        }
    }
}

/// The engine sees every database failure as a transient store outage;
/// retry policy belongs to the caller.
fn into_store_error(err: &DbError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

impl CheckInStore for Database {
    fn upsert_user(&mut self, profile: &UserProfile) -> Result<(), StoreError> {
        self.upsert_user_row(profile)
            .map_err(|err| into_store_error(&err))
    }

    fn get_user(&self, user: &UserId) -> Result<Option<UserProfile>, StoreError> {
        self.get_user_row(user).map_err(|err| into_store_error(&err))
    }

    fn record_check_in(&mut self, check_in: &CheckIn) -> Result<(), StoreError> {
        self.require_user(&check_in.user)?;
        self.upsert_check_in(check_in)
            .map_err(|err| into_store_error(&err))
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
        self.list_check_ins(user, Some(from), Some(to))
            .map_err(|err| into_store_error(&err))
    }

    fn full_history(&self, user: &UserId) -> Result<Vec<CheckIn>, StoreError> {
        self.require_user(user)?;
        self.list_check_ins(user, None, None)
            .map_err(|err| into_store_error(&err))
    }

    fn last_check_in(&self, user: &UserId) -> Result<Option<CheckIn>, StoreError> {
        self.require_user(user)?;
        self.latest_check_in(user)
            .map_err(|err| into_store_error(&err))
    }
}

impl EnrollmentStore for Database {
    fn active_enrollment(&self, user: &UserId) -> Result<Option<Enrollment>, StoreError> {
        self.require_user(user)?;
        let enrollments = self
            .list_enrollments(user)
            .map_err(|err| into_store_error(&err))?;
        Ok(enrollments.into_iter().find(sf_core::Enrollment::is_active))
    }

    fn save_enrollment(&mut self, enrollment: &Enrollment) -> Result<(), StoreError> {
        self.require_user(&enrollment.user)?;
        self.upsert_enrollment(enrollment)
            .map_err(|err| into_store_error(&err))
    }

    fn enrollments(&self, user: &UserId) -> Result<Vec<Enrollment>, StoreError> {
        self.require_user(user)?;
        self.list_enrollments(user)
            .map_err(|err| into_store_error(&err))
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(value: &str, context: &'static str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|source| DbError::DateParse {
        context,
        value: value.to_string(),
        source,
    })
}

fn parse_timestamp(value: &str, context: &'static str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            context,
            value: value.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
