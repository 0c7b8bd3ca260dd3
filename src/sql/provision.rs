use crate::config::DatabaseSettings;
use crate::error::{LoaderError, Result};
use crate::sql::{close, connect, quote_ident};
use sqlx::PgConnection;

/// What `ensure_database` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    AlreadyExists,
}

pub fn create_database_sql(name: &str) -> String {
    format!("CREATE DATABASE {}", quote_ident(name))
}

/// Create the target database through the administrative database unless it
/// already exists
pub async fn ensure_database(settings: &DatabaseSettings) -> Result<Provisioned> {
    let mut conn = connect(settings, &settings.admin_database).await?;
    let result = provision(&mut conn, &settings.database).await;
    close(conn).await;

    match &result {
        Ok(Provisioned::Created) => {
            tracing::info!(database = %settings.database, "Database created")
        }
        Ok(Provisioned::AlreadyExists) => {
            tracing::info!(database = %settings.database, "Database already exists")
        }
        Err(_) => {}
    }

    result
}

async fn provision(conn: &mut PgConnection, name: &str) -> Result<Provisioned> {
    if database_exists(conn, name).await? {
        return Ok(Provisioned::AlreadyExists);
    }

    sqlx::query(&create_database_sql(name))
        .execute(&mut *conn)
        .await
        .map_err(|e| LoaderError::load_failure(format!("database {}", name), e))?;

    Ok(Provisioned::Created)
}

/// Look the database up in `pg_database`
pub async fn database_exists(conn: &mut PgConnection, name: &str) -> Result<bool> {
    let found: Option<i32> = sqlx::query_scalar("SELECT 1 FROM pg_database WHERE datname = $1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| LoaderError::load_failure(format!("database {}", name), e))?;

    Ok(found.is_some())
}
