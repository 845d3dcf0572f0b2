//! Database pool and schema setup

use crate::orm::{movie_petitions, movies, petition_votes, reports, reviews, users};
use once_cell::sync::OnceCell;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
    Statement,
};
use std::time::Duration;

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

/// Returns the global connection pool.
///
/// # Panics
///
/// Panics if `init_db` has not been called.
pub fn get_db_pool() -> &'static DatabaseConnection {
    DB_POOL
        .get()
        .expect("Database pool accessed before init_db was called.")
}

/// Connects, applies the schema and stores the pool globally.
///
/// # Panics
///
/// Panics if the database cannot be reached or the schema cannot be applied.
pub async fn init_db(database_url: String) {
    let max_connections = crate::app_config::database().max_connections;
    let db = connect(&database_url, max_connections)
        .await
        .expect("Failed to connect to database.");
    migrate(&db).await.expect("Failed to apply database schema.");

    if DB_POOL.set(db).is_err() {
        log::warn!("init_db called more than once; keeping the first pool");
    }
}

/// Opens a connection pool without touching global state.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    // Every pooled connection to an in-memory SQLite database is its own database.
    let in_memory = database_url.contains(":memory:");
    let max_connections = if in_memory { 1 } else { max_connections.max(1) };
    if in_memory {
        // Dropping the last connection drops the database with it.
        opt.min_connections(1);
    }
    opt.max_connections(max_connections)
        .connect_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    log::info!(
        "Connected to {:?} database ({} max connections)",
        db.get_database_backend(),
        max_connections
    );
    Ok(db)
}

/// Creates any missing tables and indexes. Safe to run on every start.
///
/// Tables are created parents first so foreign keys resolve.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, users::Entity).await?;
    create_table(db, movies::Entity).await?;
    create_table(db, reviews::Entity).await?;
    create_table(db, reports::Entity).await?;
    create_table(db, movie_petitions::Entity).await?;
    create_table(db, petition_votes::Entity).await?;

    let backend = db.get_database_backend();
    for sql in [
        // Storage-level guarantee of one vote per voter per petition.
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_petition_votes_petition_voter \
         ON petition_votes (petition_id, voter_id)",
        "CREATE INDEX IF NOT EXISTS idx_petition_votes_petition_type \
         ON petition_votes (petition_id, vote_type)",
        "CREATE INDEX IF NOT EXISTS idx_reports_review_reporter \
         ON reports (review_id, reporter_id)",
        "CREATE INDEX IF NOT EXISTS idx_reviews_movie_active \
         ON reviews (movie_id, is_active)",
    ] {
        db.execute(Statement::from_string(backend, sql.to_owned()))
            .await?;
    }

    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// True when `err` came from a violated unique constraint.
///
/// The drivers only surface this through the message text.
pub fn is_unique_violation(err: &DbErr) -> bool {
    let message = err.to_string().to_lowercase();
    message.contains("unique") || message.contains("duplicate")
}

/// True when `err` means a concurrent transaction held the lock this one
/// needed. The statement had no effect and the transaction must be retried.
pub fn is_write_conflict(err: &DbErr) -> bool {
    let message = err.to_string().to_lowercase();
    // SQLite (SQLITE_BUSY / SQLITE_LOCKED), then PostgreSQL.
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("could not serialize access")
        || message.contains("deadlock detected")
}
