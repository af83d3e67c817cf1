
use roster_import::import;
use test_support::{
    count_classes, lesson_class, open_db, seed_admin, seed_volunteer, workspace, write_csv,
};

#[test]
fn creates_classes_with_derived_display_names() {
    let ws = workspace();
    let conn = open_db(&ws);
    let admin = seed_admin(&conn);
    let ann = seed_volunteer(&conn, &admin, "Ann", "Lee");
    let bo = seed_volunteer(&conn, &admin, "Bo", "Kim");

    let csv = write_csv(
        &ws,
        "classes.csv",
        "name,teacher,co_teacher\nK1,Ann,Bo\nK2,Ann,\n",
    );
    let mut out = Vec::new();
    import::class_import(&conn, &csv, &admin, &mut out).expect("import");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.contains("Created class: Ann & Bo"));
    assert!(text.contains("Created class: Ann"));

    let pair = lesson_class(&conn, "Ann & Bo").expect("co-taught class");
    assert_eq!(pair.teacher_id, ann);
    assert_eq!(pair.co_teacher_id.as_deref(), Some(bo.as_str()));
    assert!(pair.is_active);
    assert!(pair.created_at.is_some());

    let solo = lesson_class(&conn, "Ann").expect("solo class");
    assert_eq!(solo.teacher_id, ann);
    assert_eq!(solo.co_teacher_id, None);
}

#[test]
fn unknown_teacher_skips_row_and_continues() {
    let ws = workspace();
    let conn = open_db(&ws);
    let admin = seed_admin(&conn);
    seed_volunteer(&conn, &admin, "Ann", "Lee");

    let csv = write_csv(
        &ws,
        "classes.csv",
        "name,teacher,co_teacher\nK1,Zed,\nK2,Ann,\n",
    );
    let mut out = Vec::new();
    import::class_import(&conn, &csv, &admin, &mut out).expect("pass must not abort");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.contains(
        "Teacher or co-teacher not found for class K1 (Teacher: Zed, Co-teacher: None)"
    ));
    assert!(text.contains("Created class: Ann"));
    assert_eq!(count_classes(&conn), 1);
}

#[test]
fn teacher_resolution_is_case_insensitive_and_uses_stored_spelling() {
    let ws = workspace();
    let conn = open_db(&ws);
    let admin = seed_admin(&conn);
    seed_volunteer(&conn, &admin, "Ann", "Lee");

    let csv = write_csv(&ws, "classes.csv", "name,teacher\nK1,ann\n");
    let mut out = Vec::new();
    import::class_import(&conn, &csv, &admin, &mut out).expect("import");

    // Display name comes from the person row, not the CSV spelling.
    assert!(lesson_class(&conn, "Ann").is_some());
    assert!(lesson_class(&conn, "ann").is_none());
}

#[test]
fn ambiguous_teacher_name_skips_row() {
    let ws = workspace();
    let conn = open_db(&ws);
    let admin = seed_admin(&conn);
    seed_volunteer(&conn, &admin, "Ann", "Lee");
    seed_volunteer(&conn, &admin, "ann", "Kim");

    let csv = write_csv(&ws, "classes.csv", "name,teacher\nK1,ann\n");
    let mut out = Vec::new();
    import::class_import(&conn, &csv, &admin, &mut out).expect("pass must not abort");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.contains("Ambiguous teacher name ann for class K1 (2 matches), skipping"));
    assert_eq!(count_classes(&conn), 0);
}

#[test]
fn unknown_co_teacher_skips_row() {
    let ws = workspace();
    let conn = open_db(&ws);
    let admin = seed_admin(&conn);
    seed_volunteer(&conn, &admin, "Ann", "Lee");

    let csv = write_csv(&ws, "classes.csv", "name,teacher,co_teacher\nK1,Ann,Zed\n");
    let mut out = Vec::new();
    import::class_import(&conn, &csv, &admin, &mut out).expect("pass must not abort");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.contains(
        "Teacher or co-teacher not found for class K1 (Teacher: Ann, Co-teacher: Zed)"
    ));
    assert_eq!(count_classes(&conn), 0);
}

#[test]
fn row_errors_are_caught_and_logged_per_row() {
    let ws = workspace();
    let conn = open_db(&ws);
    let admin = seed_admin(&conn);

    // No teacher column at all: every row fails, every row is reported,
    // the pass still completes.
    let csv = write_csv(&ws, "classes.csv", "name\nK1\nK2\n");
    let mut out = Vec::new();
    import::class_import(&conn, &csv, &admin, &mut out).expect("pass must not abort");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.contains("Error importing class K1: missing required column `teacher`"));
    assert!(text.contains("Error importing class K2: missing required column `teacher`"));
    assert!(text.contains("Class import completed."));
    assert_eq!(count_classes(&conn), 0);
}

#[test]
fn short_row_is_padded_and_pass_continues() {
    let ws = workspace();
    let conn = open_db(&ws);
    let admin = seed_admin(&conn);
    seed_volunteer(&conn, &admin, "Ann", "Lee");

    // The K1 row is missing its co_teacher field entirely. It must be
    // handled like a row with an empty co_teacher, and the rows after
    // it must still be imported.
    let csv = write_csv(&ws, "classes.csv", "name,teacher,co_teacher\nK1,Zed\nK2,Ann,\n");
    let mut out = Vec::new();
    import::class_import(&conn, &csv, &admin, &mut out).expect("pass must not abort");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.contains(
        "Teacher or co-teacher not found for class K1 (Teacher: Zed, Co-teacher: None)"
    ));
    assert!(text.contains("Created class: Ann"));
    assert!(text.contains("Class import completed."));
    assert_eq!(count_classes(&conn), 1);
}

#[test]
fn rerun_reports_existing_class_without_duplicating() {
    let ws = workspace();
    let conn = open_db(&ws);
    let admin = seed_admin(&conn);
    seed_volunteer(&conn, &admin, "Ann", "Lee");
    seed_volunteer(&conn, &admin, "Bo", "Kim");

    let csv = write_csv(&ws, "classes.csv", "name,teacher,co_teacher\nK1,Ann,Bo\n");
    let mut out = Vec::new();
    import::class_import(&conn, &csv, &admin, &mut out).expect("first run");

    let mut out = Vec::new();
    import::class_import(&conn, &csv, &admin, &mut out).expect("second run");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.contains("Class already exists: Ann & Bo"));
    assert_eq!(count_classes(&conn), 1);
}
