use std::{fs, path::Path};
use util::{config, paths};

mod runner;

/// `migration [up|fresh|clean|status]` against `DATABASE_PATH`.
#[tokio::main]
async fn main() {
    let db_path = config::database_path();
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("clean") => remove_db_file(&paths::database_file()),
        Some("fresh") => {
            remove_db_file(&paths::database_file());
            runner::run_pending(&database_url(&db_path)).await;
        }
        Some("status") => runner::print_status(&database_url(&db_path)).await,
        _ => runner::run_pending(&database_url(&db_path)).await,
    }
}

fn database_url(db_path: &str) -> String {
    paths::database_url(db_path).expect("Failed to create the store directory")
}

fn remove_db_file(db_path: &Path) {
    if db_path.exists() {
        fs::remove_file(db_path).expect("Failed to delete the store file");
        println!("Deleted store: {}", db_path.display());
    } else {
        println!("No store file at {}", db_path.display());
    }
}
