use sqlx::{Connection, PgConnection};

use crate::config::DbSettings;
use crate::error::AppError;

/// SQLSTATE for `duplicate_database`.
const DUPLICATE_DATABASE: &str = "42P04";

/// Create the configured database unless it already exists.
///
/// Connects to the `postgres` maintenance database for the check, so the
/// configured user needs `CREATEDB` the first time round.
pub async fn create_database(settings: &DbSettings) -> Result<(), AppError> {
    let mut conn = PgConnection::connect_with(&settings.maintenance_options()).await?;

    let exists: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM pg_database WHERE datname = $1")
        .bind(&settings.database_name)
        .fetch_optional(&mut conn)
        .await?;

    if exists.is_none() {
        let statement = format!(
            "CREATE DATABASE {}",
            quote_identifier(&settings.database_name)
        );
        match sqlx::query(&statement).execute(&mut conn).await {
            Ok(_) => tracing::info!("Created database '{}'", settings.database_name),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(DUPLICATE_DATABASE) => {
                tracing::info!("Database '{}' already exists", settings.database_name);
            }
            Err(e) => {
                let _ = conn.close().await;
                return Err(e.into());
            }
        }
    }

    conn.close().await?;
    Ok(())
}

/// Open a single auto-commit connection to the configured database.
pub async fn connect(settings: &DbSettings) -> Result<PgConnection, AppError> {
    let conn = PgConnection::connect_with(&settings.connect_options()).await?;
    Ok(conn)
}

pub async fn run_migrations(conn: &mut PgConnection) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(conn).await?;
    Ok(())
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
