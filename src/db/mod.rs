// The tournament database.
mod fixture;
mod group;
mod placeholder;
mod stage;
mod team;

use sqlx::{Sqlite, migrate::MigrateDatabase, sqlite::SqlitePoolOptions};
use tracing::info;

use crate::logic::{error::Result, types::Db};

// Connect to the database and bring the schema up to date.
pub async fn setup(url: &str) -> Result<Db> {
    let db = if url.contains(":memory:") {
        // Every connection to an in-memory database is a database of its own, so keep exactly one alive.
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url).await?
    }
    else {
        if !Sqlite::database_exists(url).await? {
            info!(url, "creating database");
            Sqlite::create_database(url).await?;
        }
        SqlitePoolOptions::new().connect(url).await?
    };

    sqlx::migrate!("sql/migrations").run(&db).await?;
    return Ok(db);
}
