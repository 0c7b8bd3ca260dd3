use crate::config::DatabaseSettings;
use crate::error::{LoaderError, Result};
use crate::partition::Partition;
use crate::sql::{close, connect, create_table_sql, insert_batches, TypeMapping};
use sqlx::{Connection, PgConnection};

/// Create the target table for a partition if it does not exist yet
pub async fn create_table(
    conn: &mut PgConnection,
    table: &str,
    partition: &Partition,
    mapping: &TypeMapping,
) -> Result<()> {
    let sql = create_table_sql(table, &partition.columns, mapping)?;
    tracing::debug!(table, sql = %sql, "Creating table");

    sqlx::query(&sql)
        .execute(&mut *conn)
        .await
        .map_err(|e| LoaderError::load_failure(table, e))?;

    Ok(())
}

/// Insert every row of a partition into `table`.
///
/// The partition is loaded all-or-nothing: one statement when it fits the
/// bind-parameter limit, otherwise several statements in one transaction.
pub async fn load_partition(
    conn: &mut PgConnection,
    table: &str,
    partition: &Partition,
) -> Result<u64> {
    let mut batches = insert_batches(table, partition);

    match batches.len() {
        0 => Ok(0),
        1 => {
            let result = batches[0]
                .builder
                .build()
                .execute(&mut *conn)
                .await
                .map_err(|e| LoaderError::load_failure(table, e))?;
            Ok(result.rows_affected())
        }
        n => {
            tracing::debug!(table, statements = n, "Partition exceeds bind limit, splitting insert");

            let mut tx = conn
                .begin()
                .await
                .map_err(|e| LoaderError::load_failure(table, e))?;

            let mut inserted = 0;
            for batch in &mut batches {
                let result = batch
                    .builder
                    .build()
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| LoaderError::load_failure(table, e))?;
                inserted += result.rows_affected();
            }

            tx.commit()
                .await
                .map_err(|e| LoaderError::load_failure(table, e))?;

            Ok(inserted)
        }
    }
}

/// Create and fill one table on its own connection
pub async fn load_table(
    settings: &DatabaseSettings,
    table: &str,
    partition: &Partition,
    mapping: &TypeMapping,
) -> Result<u64> {
    let mut conn = connect(settings, &settings.database).await?;
    let result = create_and_load(&mut conn, table, partition, mapping).await;
    close(conn).await;
    result
}

async fn create_and_load(
    conn: &mut PgConnection,
    table: &str,
    partition: &Partition,
    mapping: &TypeMapping,
) -> Result<u64> {
    create_table(conn, table, partition, mapping).await?;
    load_partition(conn, table, partition).await
}
