use colored::*;
use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;
use std::time::Instant;

use migration::Migrator;

const STATUS_COLUMN: usize = 72;

async fn connect(url: &str) -> DatabaseConnection {
    match sea_orm::Database::connect(url).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("{} {}", "cannot open store database:".red(), e);
            std::process::exit(1);
        }
    }
}

/// Apply every pending migration, one line per migration.
pub async fn run_pending(url: &str) {
    let db = connect(url).await;
    println!("Migrating store at {}", url.dimmed());

    let pending = match Migrator::get_pending_migrations(&db).await {
        Ok(pending) => pending,
        Err(e) => {
            eprintln!("{} {}", "cannot read migration history:".red(), e);
            std::process::exit(1);
        }
    };
    if pending.is_empty() {
        println!("{}", "Schema is up to date".green());
        return;
    }

    for migration in pending {
        let label = format!("Applying {}", migration.name().bold());
        let dots = ".".repeat(STATUS_COLUMN.saturating_sub(label.len()));
        let start = Instant::now();
        match Migrator::up(&db, Some(1)).await {
            Ok(()) => println!(
                "{label}{dots} {} {}",
                "done".green(),
                format!("({:.2?})", start.elapsed()).dimmed()
            ),
            Err(e) => {
                println!("{label}{dots} {} {e}", "failed".red());
                std::process::exit(1);
            }
        }
    }
}

/// Print applied and pending migrations.
pub async fn print_status(url: &str) {
    let db = connect(url).await;
    if let Err(e) = Migrator::status(&db).await {
        eprintln!("{} {}", "cannot read migration history:".red(), e);
        std::process::exit(1);
    }
}
