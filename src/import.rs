use std::io::Write;
use std::path::Path;

use anyhow::Context;
use rusqlite::Connection;
use serde::Deserialize;
use tracing::debug;

use crate::store::{self, NameMatch, PlayerFields, VolunteerFields};

// Empty CSV fields deserialize to None, so "supplied" below always
// means a non-empty value.

#[derive(Debug, Deserialize)]
struct VolunteerRow {
    first_name: Option<String>,
    last_name: Option<String>,
    rating: Option<String>,
    beginning_rating: Option<String>,
    active_member: Option<String>,
    parent_or_guardian: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClassRow {
    // `name` is only used in diagnostics; the stored name is derived
    // from the resolved teacher rows.
    name: Option<String>,
    teacher: Option<String>,
    co_teacher: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlayerRow {
    first_name: Option<String>,
    last_name: Option<String>,
    rating: Option<String>,
    beginning_rating: Option<String>,
    grade: Option<String>,
    lesson_class: Option<String>,
    active_member: Option<String>,
    is_volunteer: Option<String>,
    parent_or_guardian: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    additional_info: Option<String>,
}

fn csv_reader(path: &Path) -> anyhow::Result<csv::Reader<std::io::Cursor<Vec<u8>>>> {
    let mut bytes =
        std::fs::read(path).with_context(|| format!("open {}", path.display()))?;
    // UTF-8 byte-order mark is optional in the input files.
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        bytes.drain(..3);
    }
    // Short rows pad their missing Option columns to None instead of
    // rejecting the record; a padded-away required column still fails
    // in `required`.
    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(std::io::Cursor::new(bytes)))
}

fn required<'a>(field: &'a Option<String>, column: &str) -> anyhow::Result<&'a str> {
    field
        .as_deref()
        .with_context(|| format!("missing required column `{}`", column))
}

fn parse_rating(field: &Option<String>, default: i64) -> anyhow::Result<i64> {
    match field.as_deref() {
        Some(v) => v
            .trim()
            .parse::<i64>()
            .with_context(|| format!("invalid numeric value `{}`", v)),
        None => Ok(default),
    }
}

/// The literals "", "NULL", and "None" mean "no beginning rating"
/// (case-sensitive match only). Anything else must parse as an integer.
fn normalize_beginning_rating(field: &Option<String>) -> anyhow::Result<Option<i64>> {
    match field.as_deref() {
        None | Some("") | Some("NULL") | Some("None") => Ok(None),
        Some(v) => {
            let n = v
                .trim()
                .parse::<i64>()
                .with_context(|| format!("invalid beginning_rating value `{}`", v))?;
            Ok(Some(n))
        }
    }
}

/// Only the exact word "true" (any case) is truthy; anything else,
/// including "1" or "yes", is false. An absent field takes the default.
fn parse_flag(field: &Option<String>, default: bool) -> bool {
    match field.as_deref() {
        Some(v) => v.eq_ignore_ascii_case("true"),
        None => default,
    }
}

fn class_display_name(teacher_first: &str, co_teacher_first: Option<&str>) -> String {
    match co_teacher_first {
        Some(co) => format!("{} & {}", teacher_first, co),
        None => teacher_first.to_string(),
    }
}

/// First pass. Must run before `class_import` so volunteers can be
/// resolved as teachers. Any row error is fatal for the run.
pub fn volunteer_import(
    conn: &Connection,
    path: &Path,
    modified_by: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    writeln!(out, "Starting volunteer import...")?;
    let mut reader = csv_reader(path)?;
    for row in reader.deserialize() {
        let row: VolunteerRow = row?;
        let first_name = required(&row.first_name, "first_name")?.trim().to_string();
        let last_name = required(&row.last_name, "last_name")?.trim().to_string();

        let fields = VolunteerFields {
            rating: parse_rating(&row.rating, 100)?,
            beginning_rating: normalize_beginning_rating(&row.beginning_rating)?,
            active_member: parse_flag(&row.active_member, true),
            parent_or_guardian: row.parent_or_guardian,
            email: row.email,
            phone: row.phone,
        };

        let (person_id, created) =
            store::upsert_volunteer(conn, &last_name, &first_name, &fields, modified_by)?;
        if created {
            store::set_person_created_at(conn, &person_id)?;
            writeln!(out, "Created Volunteer: {} {}", first_name, last_name)?;
        } else {
            writeln!(out, "Updated Volunteer: {} {}", first_name, last_name)?;
        }
    }
    writeln!(out, "Volunteer import completed.")?;
    Ok(())
}

/// Second pass. Row errors are never fatal: lookup misses and
/// anything else a row throws are reported and the pass moves on.
pub fn class_import(
    conn: &Connection,
    path: &Path,
    modified_by: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    writeln!(out, "Starting class import...")?;
    let mut reader = csv_reader(path)?;
    for row in reader.deserialize() {
        // A record that fails to parse is a row error like any other
        // in this pass: reported, then on to the next row.
        let row: ClassRow = match row {
            Ok(row) => row,
            Err(e) => {
                writeln!(out, "Error importing class unknown: {:#}", e)?;
                continue;
            }
        };
        let label = row.name.as_deref().unwrap_or("unknown").to_string();
        if let Err(e) = import_class_row(conn, &row, &label, modified_by, &mut *out) {
            writeln!(out, "Error importing class {}: {:#}", label, e)?;
        }
    }
    writeln!(out, "Class import completed.")?;
    Ok(())
}

fn import_class_row(
    conn: &Connection,
    row: &ClassRow,
    label: &str,
    modified_by: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let teacher_name = required(&row.teacher, "teacher")?;
    let co_teacher_name = row.co_teacher.as_deref();

    let not_found = |out: &mut dyn Write| -> anyhow::Result<()> {
        writeln!(
            out,
            "Teacher or co-teacher not found for class {} (Teacher: {}, Co-teacher: {})",
            label,
            teacher_name,
            co_teacher_name.unwrap_or("None")
        )?;
        Ok(())
    };

    let teacher = match store::find_person_by_first_name_ci(conn, teacher_name)? {
        NameMatch::Found(p) => p,
        NameMatch::NotFound => return not_found(out),
        NameMatch::Ambiguous(candidates) => {
            writeln!(
                out,
                "Ambiguous teacher name {} for class {} ({} matches), skipping",
                teacher_name,
                label,
                candidates.len()
            )?;
            return Ok(());
        }
    };

    let co_teacher = match co_teacher_name {
        Some(name) => match store::find_person_by_first_name_ci(conn, name)? {
            NameMatch::Found(p) => Some(p),
            NameMatch::NotFound => return not_found(out),
            NameMatch::Ambiguous(candidates) => {
                writeln!(
                    out,
                    "Ambiguous co-teacher name {} for class {} ({} matches), skipping",
                    name,
                    label,
                    candidates.len()
                )?;
                return Ok(());
            }
        },
        None => None,
    };

    // The dedup name uses the first names as stored, not the CSV spelling.
    let name = class_display_name(
        &teacher.first_name,
        co_teacher.as_ref().map(|c| c.first_name.as_str()),
    );

    let (class_id, created) = store::get_or_create_lesson_class(
        conn,
        &name,
        &teacher.id,
        co_teacher.as_ref().map(|c| c.id.as_str()),
        modified_by,
    )?;
    if created {
        store::set_lesson_class_created_at(conn, &class_id)?;
        writeln!(out, "Created class: {}", name)?;
    } else {
        writeln!(out, "Class already exists: {}", name)?;
    }
    Ok(())
}

/// Third pass. A missing lesson class only drops the link; every
/// other row error is fatal for the run. Names are NOT trimmed here,
/// unlike `volunteer_import`.
pub fn player_import(
    conn: &Connection,
    path: &Path,
    modified_by: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    writeln!(out, "Starting player import...")?;
    let mut reader = csv_reader(path)?;
    for row in reader.deserialize() {
        let row: PlayerRow = row?;
        let first_name = required(&row.first_name, "first_name")?.to_string();
        let last_name = required(&row.last_name, "last_name")?.to_string();

        let lesson_class_id = match row.lesson_class.as_deref() {
            Some(name) => match store::find_lesson_class_by_name(conn, name)? {
                Some(id) => Some(id),
                None => {
                    writeln!(
                        out,
                        "LessonClass with identifier {} not found, skipping player {} {}.",
                        name, first_name, last_name
                    )?;
                    None
                }
            },
            None => None,
        };

        let fields = PlayerFields {
            rating: parse_rating(&row.rating, 100)?,
            beginning_rating: parse_rating(&row.beginning_rating, 100)?,
            grade: row.grade,
            lesson_class_id,
            active_member: parse_flag(&row.active_member, true),
            is_volunteer: parse_flag(&row.is_volunteer, false),
            parent_or_guardian: row.parent_or_guardian,
            email: row.email,
            phone: row.phone,
            additional_info: row.additional_info,
        };

        let (person_id, created) =
            store::upsert_player(conn, &last_name, &first_name, &fields, modified_by)?;
        if created {
            store::set_person_created_at(conn, &person_id)?;
            writeln!(out, "Created: {} {}", first_name, last_name)?;
        } else {
            writeln!(out, "Updated: {} {}", first_name, last_name)?;
        }
        debug!(%person_id, created, "imported player row");
    }
    writeln!(out, "Player import completed.")?;
    Ok(())
}

/// Runs the three passes in their required order. `modified_by` is
/// the already-resolved administrative user id.
pub fn run_all(
    conn: &Connection,
    volunteers_csv: &Path,
    classes_csv: &Path,
    players_csv: &Path,
    modified_by: &str,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    volunteer_import(conn, volunteers_csv, modified_by, &mut *out)?;
    class_import(conn, classes_csv, modified_by, &mut *out)?;
    player_import(conn, players_csv, modified_by, &mut *out)?;
    Ok(())
}
