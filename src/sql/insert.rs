use crate::partition::{ColumnType, Partition};
use crate::sql::ddl::quote_ident;
use crate::types::Cell;
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder};

/// PostgreSQL's limit on bind parameters in a single statement
pub const MAX_BIND_PARAMS: usize = 65_535;

/// One multi-row `INSERT` statement over a slice of a partition
pub struct InsertBatch<'a> {
    pub builder: QueryBuilder<'a, Postgres>,
    pub rows: usize,
}

impl InsertBatch<'_> {
    pub fn sql(&self) -> &str {
        self.builder.sql()
    }
}

/// Number of rows that fit in one statement for a table of `width` columns
pub fn rows_per_statement(width: usize) -> usize {
    (MAX_BIND_PARAMS / width.max(1)).max(1)
}

/// Build the insert statements for a whole partition.
///
/// A partition within the bind-parameter limit is a single statement.
pub fn insert_batches<'a>(table: &str, partition: &'a Partition) -> Vec<InsertBatch<'a>> {
    if partition.is_empty() || partition.columns.is_empty() {
        return Vec::new();
    }

    let column_list = partition
        .columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let prefix = format!("INSERT INTO {} ({}) ", quote_ident(table), column_list);

    partition
        .rows
        .chunks(rows_per_statement(partition.columns.len()))
        .map(|chunk| {
            let mut builder = QueryBuilder::new(prefix.as_str());
            builder.push_values(chunk, |mut values, row| {
                for (cell, column) in row.iter().zip(&partition.columns) {
                    bind_cell(&mut values, cell, column.column_type);
                }
            });
            InsertBatch {
                builder,
                rows: chunk.len(),
            }
        })
        .collect()
}

/// Bind a cell with the Rust type matching its column's storage type, so that
/// nulls are sent as typed NULLs
fn bind_cell<'args>(
    values: &mut Separated<'_, 'args, Postgres, &'static str>,
    cell: &'args Cell,
    column_type: ColumnType,
) {
    // Integer tiers bound the values, so the narrowing casts are lossless
    match column_type {
        ColumnType::Boolean => values.push_bind(cell.as_bool()),
        ColumnType::Int8 | ColumnType::Int16 => values.push_bind(cell.as_i64().map(|v| v as i16)),
        ColumnType::Int32 => values.push_bind(cell.as_i64().map(|v| v as i32)),
        ColumnType::Int64 => values.push_bind(cell.as_i64()),
        ColumnType::Float64 => values.push_bind(cell.as_f64()),
        ColumnType::Text | ColumnType::Opaque => values.push_bind(cell.as_str()),
    };
}
