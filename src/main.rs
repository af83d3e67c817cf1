use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use roster_import::{db, import, store};

/// Import roster data from CSV files: volunteers, classes, players.
///
/// The passes run in that fixed order because classes reference
/// volunteers as teachers and players reference classes.
#[derive(Parser)]
#[command(name = "roster-import", version)]
struct Cli {
    /// Path to the volunteers CSV file
    volunteers_csv: PathBuf,
    /// Path to the classes CSV file
    classes_csv: PathBuf,
    /// Path to the players CSV file
    players_csv: PathBuf,
    /// SQLite roster database to import into
    #[arg(long, env = "ROSTER_DB", default_value = "roster.sqlite3")]
    db: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let conn = db::open_db(&cli.db)
        .with_context(|| format!("open database {}", cli.db.display()))?;

    // Resolved once; every imported row records this identity as its
    // last modifier.
    let admin = store::find_user_by_username(&conn, store::ADMIN_USERNAME)?
        .with_context(|| {
            format!(
                "administrative user '{}' not found in {}",
                store::ADMIN_USERNAME,
                cli.db.display()
            )
        })?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    import::run_all(
        &conn,
        &cli.volunteers_csv,
        &cli.classes_csv,
        &cli.players_csv,
        &admin,
        &mut out,
    )?;
    out.flush()?;
    Ok(())
}
