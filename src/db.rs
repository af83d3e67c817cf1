use rusqlite::Connection;
use std::path::Path;

pub fn open_db(db_path: &Path) -> anyhow::Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS people(
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            rating INTEGER NOT NULL DEFAULT 100,
            beginning_rating INTEGER,
            active_member INTEGER NOT NULL DEFAULT 1,
            is_volunteer INTEGER NOT NULL DEFAULT 0,
            grade TEXT,
            lesson_class_id TEXT,
            parent_or_guardian TEXT,
            email TEXT,
            phone TEXT,
            additional_info TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT,
            modified_by TEXT NOT NULL,
            UNIQUE(last_name, first_name),
            FOREIGN KEY(lesson_class_id) REFERENCES lesson_classes(id),
            FOREIGN KEY(modified_by) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_people_lesson_class ON people(lesson_class_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS lesson_classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            teacher_id TEXT NOT NULL,
            co_teacher_id TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT,
            modified_by TEXT NOT NULL,
            FOREIGN KEY(teacher_id) REFERENCES people(id),
            FOREIGN KEY(co_teacher_id) REFERENCES people(id),
            FOREIGN KEY(modified_by) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_lesson_classes_name ON lesson_classes(name)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_lesson_classes_teacher ON lesson_classes(teacher_id)",
        [],
    )?;

    Ok(conn)
}
