use std::path::Path;

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::SqliteDatabase;

/// A fresh, migrated order store in its own SQLite file. Every call gets a new file, so tests never share state.
pub async fn fresh_order_store() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    match SqliteDatabase::new_with_url(&url, 5).await {
        Ok(db) => db,
        Err(e) => panic!("Could not open test order store at {url}. {e}"),
    }
}

pub fn random_db_path() -> String {
    format!("sqlite://../data/test_orders_{:016x}.db", rand::random::<u64>())
}

/// Loads `.env.test`, starts logging and (re)creates the database at `url` with the current schema.
pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    recreate_database(url).await;
    let db = match SqliteDatabase::new_with_url(url, 1).await {
        Ok(db) => db,
        Err(e) => panic!("Could not connect to {url}. {e}"),
    };
    if let Err(e) = db.migrate().await {
        panic!("Migrations failed for {url}. {e}");
    }
    debug!("🗃️ Test order store ready at {url}");
}

async fn recreate_database(url: &str) {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        if let Err(e) = Sqlite::drop_database(url).await {
            warn!("🗃️ Could not drop stale test database {url}. {e}");
        }
    }
    if let Some(dir) = url.strip_prefix("sqlite://").and_then(|f| Path::new(f).parent()) {
        let _ = std::fs::create_dir_all(dir);
    }
    if let Err(e) = Sqlite::create_database(url).await {
        panic!("Could not create test database {url}. {e}");
    }
}
