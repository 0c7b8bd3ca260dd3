use crate::error::{LoaderError, Result};
use crate::partition::Column;
use crate::sql::TypeMapping;

/// Double-quote an identifier, doubling any embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Build the `CREATE TABLE IF NOT EXISTS` statement for a partition
pub fn create_table_sql(table: &str, columns: &[Column], mapping: &TypeMapping) -> Result<String> {
    let definitions = columns
        .iter()
        .map(|column| -> Result<String> {
            let sql_type = mapping.sql_type(column.column_type).ok_or_else(|| {
                LoaderError::UnmappedType {
                    table: table.to_string(),
                    column: column.name.clone(),
                    column_type: column.column_type,
                }
            })?;
            Ok(format!("{} {}", quote_ident(&column.name), sql_type))
        })
        .collect::<Result<Vec<String>>>()?;

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({});",
        quote_ident(table),
        definitions.join(", ")
    ))
}
