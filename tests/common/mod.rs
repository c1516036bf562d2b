//! Common test utilities.

use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;
use zenshell_bot::repository::Repository;
use zenshell_bot::service::Services;

/// Sets up a temporary test database.
pub async fn setup_db() -> (Arc<Repository>, PathBuf) {
    let uuid = Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("zenshell-bot-test-{}.db", uuid));
    let db_url = format!("sqlite://{}", db_path.to_str().unwrap());

    let db = Repository::new(&db_url, db_path.to_str().unwrap())
        .await
        .expect("Failed to create database");

    db.run_migrations().await.expect("Failed to run migrations");

    (Arc::new(db), db_path)
}

/// Sets up a temporary database with every service wired to it.
#[allow(dead_code)]
pub async fn setup_services() -> (Arc<Services>, Arc<Repository>, PathBuf) {
    let (db, db_path) = setup_db().await;
    let services = Services::new(db.clone())
        .await
        .expect("Failed to create services");
    (Arc::new(services), db, db_path)
}

/// Cleans up the test database file.
pub async fn teardown_db(db_path: PathBuf) {
    if db_path.exists() {
        let _ = std::fs::remove_file(db_path);
    }
}
