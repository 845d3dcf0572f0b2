//! Test database setup and management
#![allow(dead_code)]

use sea_orm::{DatabaseConnection, DbErr};
use std::env;

/// In-memory SQLite unless `TEST_DATABASE_URL` points elsewhere.
fn test_database_url() -> String {
    env::var("TEST_DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string())
}

/// Setup test database - connect and make sure the schema exists
///
/// Every call against the default in-memory database yields a fresh, empty
/// database.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    let db = marquee::db::connect(&test_database_url(), 5).await?;
    marquee::db::migrate(&db).await?;
    Ok(db)
}

/// Cleanup function to remove test data
///
/// Child tables are listed before their parents.
pub async fn cleanup_test_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    use marquee::orm::{movie_petitions, movies, petition_votes, reports, reviews, users};
    use sea_orm::EntityTrait;

    petition_votes::Entity::delete_many().exec(db).await?;
    movie_petitions::Entity::delete_many().exec(db).await?;
    reports::Entity::delete_many().exec(db).await?;
    reviews::Entity::delete_many().exec(db).await?;
    movies::Entity::delete_many().exec(db).await?;
    users::Entity::delete_many().exec(db).await?;

    Ok(())
}

/// File-backed SQLite in `dir` with a real connection pool, for tests that
/// need several transactions in flight at once.
pub async fn setup_file_database(dir: &tempfile::TempDir) -> Result<DatabaseConnection, DbErr> {
    let path = dir.path().join("marquee_test.db");
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let db = marquee::db::connect(&url, 8).await?;
    marquee::db::migrate(&db).await?;
    Ok(db)
}
