use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

/// Username of the fixed administrative identity recorded as
/// `modified_by` on every imported row.
pub const ADMIN_USERNAME: &str = "m";

#[derive(Debug, Clone)]
pub struct PersonRef {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

/// Result of a case-insensitive first-name lookup. Ambiguous matches
/// are surfaced to the caller instead of being treated as a lookup
/// failure.
#[derive(Debug)]
pub enum NameMatch {
    Found(PersonRef),
    NotFound,
    Ambiguous(Vec<PersonRef>),
}

#[derive(Debug)]
pub struct VolunteerFields {
    pub rating: i64,
    pub beginning_rating: Option<i64>,
    pub active_member: bool,
    pub parent_or_guardian: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug)]
pub struct PlayerFields {
    pub rating: i64,
    pub beginning_rating: i64,
    pub grade: Option<String>,
    pub lesson_class_id: Option<String>,
    pub active_member: bool,
    pub is_volunteer: bool,
    pub parent_or_guardian: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub additional_info: Option<String>,
}

pub fn find_user_by_username(conn: &Connection, username: &str) -> anyhow::Result<Option<String>> {
    let id = conn
        .query_row("SELECT id FROM users WHERE username = ?", [username], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(id)
}

pub fn create_user(conn: &Connection, username: &str) -> anyhow::Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO users(id, username) VALUES(?, ?)",
        (&id, username),
    )?;
    Ok(id)
}

/// Upsert a person keyed by the exact (last_name, first_name) pair,
/// writing only the volunteer-pass fields. Grade, class link, and
/// notes are left untouched on update. Returns (person_id, created).
pub fn upsert_volunteer(
    conn: &Connection,
    last_name: &str,
    first_name: &str,
    fields: &VolunteerFields,
    modified_by: &str,
) -> anyhow::Result<(String, bool)> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM people WHERE last_name = ? AND first_name = ?",
            (last_name, first_name),
            |r| r.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        conn.execute(
            "UPDATE people SET
               rating = ?,
               beginning_rating = ?,
               active_member = ?,
               is_volunteer = 1,
               parent_or_guardian = ?,
               email = ?,
               phone = ?,
               is_active = 1,
               modified_by = ?
             WHERE id = ?",
            (
                fields.rating,
                fields.beginning_rating,
                fields.active_member,
                fields.parent_or_guardian.as_deref(),
                fields.email.as_deref(),
                fields.phone.as_deref(),
                modified_by,
                &id,
            ),
        )?;
        debug!(person_id = %id, "updated volunteer");
        Ok((id, false))
    } else {
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO people(
               id,
               first_name,
               last_name,
               rating,
               beginning_rating,
               active_member,
               is_volunteer,
               parent_or_guardian,
               email,
               phone,
               is_active,
               modified_by
             ) VALUES(?, ?, ?, ?, ?, ?, 1, ?, ?, ?, 1, ?)",
            (
                &id,
                first_name,
                last_name,
                fields.rating,
                fields.beginning_rating,
                fields.active_member,
                fields.parent_or_guardian.as_deref(),
                fields.email.as_deref(),
                fields.phone.as_deref(),
                modified_by,
            ),
        )?;
        debug!(person_id = %id, "created volunteer");
        Ok((id, true))
    }
}

/// Upsert a person keyed by the exact (last_name, first_name) pair,
/// writing the full player-pass field set. Returns (person_id, created).
pub fn upsert_player(
    conn: &Connection,
    last_name: &str,
    first_name: &str,
    fields: &PlayerFields,
    modified_by: &str,
) -> anyhow::Result<(String, bool)> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM people WHERE last_name = ? AND first_name = ?",
            (last_name, first_name),
            |r| r.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        conn.execute(
            "UPDATE people SET
               rating = ?,
               beginning_rating = ?,
               grade = ?,
               lesson_class_id = ?,
               active_member = ?,
               is_volunteer = ?,
               parent_or_guardian = ?,
               email = ?,
               phone = ?,
               additional_info = ?,
               is_active = 1,
               modified_by = ?
             WHERE id = ?",
            (
                fields.rating,
                fields.beginning_rating,
                fields.grade.as_deref(),
                fields.lesson_class_id.as_deref(),
                fields.active_member,
                fields.is_volunteer,
                fields.parent_or_guardian.as_deref(),
                fields.email.as_deref(),
                fields.phone.as_deref(),
                fields.additional_info.as_deref(),
                modified_by,
                &id,
            ),
        )?;
        debug!(person_id = %id, "updated player");
        Ok((id, false))
    } else {
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO people(
               id,
               first_name,
               last_name,
               rating,
               beginning_rating,
               grade,
               lesson_class_id,
               active_member,
               is_volunteer,
               parent_or_guardian,
               email,
               phone,
               additional_info,
               is_active,
               modified_by
             ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)",
            (
                &id,
                first_name,
                last_name,
                fields.rating,
                fields.beginning_rating,
                fields.grade.as_deref(),
                fields.lesson_class_id.as_deref(),
                fields.active_member,
                fields.is_volunteer,
                fields.parent_or_guardian.as_deref(),
                fields.email.as_deref(),
                fields.phone.as_deref(),
                fields.additional_info.as_deref(),
                modified_by,
            ),
        )?;
        debug!(person_id = %id, "created player");
        Ok((id, true))
    }
}

/// Creation timestamps are set only on first creation, as a second
/// write after the insert.
pub fn set_person_created_at(conn: &Connection, person_id: &str) -> anyhow::Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE people SET created_at = ? WHERE id = ?",
        (&now, person_id),
    )?;
    Ok(())
}

pub fn set_lesson_class_created_at(conn: &Connection, class_id: &str) -> anyhow::Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE lesson_classes SET created_at = ? WHERE id = ?",
        (&now, class_id),
    )?;
    Ok(())
}

/// Case-insensitive exact match on first name. SQLite NOCASE folds
/// ASCII only, which is the intended case-insensitivity here.
pub fn find_person_by_first_name_ci(
    conn: &Connection,
    first_name: &str,
) -> anyhow::Result<NameMatch> {
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name FROM people
         WHERE first_name = ? COLLATE NOCASE
         ORDER BY rowid",
    )?;
    let mut people = stmt
        .query_map([first_name], |r| {
            Ok(PersonRef {
                id: r.get(0)?,
                first_name: r.get(1)?,
                last_name: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    if people.is_empty() {
        Ok(NameMatch::NotFound)
    } else if people.len() == 1 {
        Ok(NameMatch::Found(people.remove(0)))
    } else {
        Ok(NameMatch::Ambiguous(people))
    }
}

/// Get-or-create keyed by the (name, teacher, co_teacher) triple.
/// An existing class is returned as-is, not updated.
/// Returns (class_id, created).
pub fn get_or_create_lesson_class(
    conn: &Connection,
    name: &str,
    teacher_id: &str,
    co_teacher_id: Option<&str>,
    modified_by: &str,
) -> anyhow::Result<(String, bool)> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM lesson_classes
             WHERE name = ? AND teacher_id = ? AND co_teacher_id IS ?",
            (name, teacher_id, co_teacher_id),
            |r| r.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok((id, false));
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO lesson_classes(id, name, teacher_id, co_teacher_id, is_active, modified_by)
         VALUES(?, ?, ?, ?, 1, ?)",
        (&id, name, teacher_id, co_teacher_id, modified_by),
    )?;
    debug!(class_id = %id, name, "created lesson class");
    Ok((id, true))
}

/// Exact display-name match. Returns the first matching class id.
pub fn find_lesson_class_by_name(
    conn: &Connection,
    name: &str,
) -> anyhow::Result<Option<String>> {
    let id = conn
        .query_row(
            "SELECT id FROM lesson_classes WHERE name = ? ORDER BY rowid",
            [name],
            |r| r.get(0),
        )
        .optional()?;
    Ok(id)
}
