//! PostgreSQL side of the loader: type mapping, DDL and insert generation,
//! database provisioning and bulk loading
//!
//! Every database-facing operation opens its own connection for one unit of
//! work and returns a typed result; nothing is retried.

pub mod ddl;
pub mod insert;
pub mod load;
pub mod provision;
pub mod type_map;

pub use ddl::{create_table_sql, quote_ident};
pub use insert::{insert_batches, InsertBatch, MAX_BIND_PARAMS};
pub use load::{create_table, load_partition, load_table};
pub use provision::{create_database_sql, ensure_database, Provisioned};
pub use type_map::TypeMapping;

use crate::config::DatabaseSettings;
use crate::error::{LoaderError, Result};
use sqlx::{Connection, PgConnection};

/// Open a connection to `database` on the configured server
pub async fn connect(settings: &DatabaseSettings, database: &str) -> Result<PgConnection> {
    PgConnection::connect_with(&settings.connect_options(database))
        .await
        .map_err(|source| LoaderError::ConnectionError {
            database: database.to_string(),
            source,
        })
}

/// Close a connection gracefully. A failed close is only logged; the
/// socket is released either way.
pub async fn close(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "Failed to close database connection cleanly");
    }
}
