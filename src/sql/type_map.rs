use crate::partition::ColumnType;
use std::collections::BTreeMap;

/// Immutable mapping from inferred column types to PostgreSQL column types
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMapping {
    entries: BTreeMap<ColumnType, String>,
}

impl TypeMapping {
    /// The standard PostgreSQL mapping
    pub fn postgres() -> Self {
        TypeMapping::from_entries([
            (ColumnType::Boolean, "BOOLEAN"),
            (ColumnType::Int8, "SMALLINT"),
            (ColumnType::Int16, "SMALLINT"),
            (ColumnType::Int32, "INTEGER"),
            (ColumnType::Int64, "BIGINT"),
            (ColumnType::Float64, "DOUBLE PRECISION"),
            (ColumnType::Text, "VARCHAR"),
            (ColumnType::Opaque, "TEXT"),
        ])
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ColumnType, S)>,
        S: Into<String>,
    {
        TypeMapping {
            entries: entries
                .into_iter()
                .map(|(ty, sql)| (ty, sql.into()))
                .collect(),
        }
    }

    pub fn sql_type(&self, column_type: ColumnType) -> Option<&str> {
        self.entries.get(&column_type).map(String::as_str)
    }

    /// Inferred types with no storage type
    pub fn unmapped(&self) -> Vec<ColumnType> {
        ColumnType::ALL
            .into_iter()
            .filter(|ty| !self.entries.contains_key(ty))
            .collect()
    }
}

impl Default for TypeMapping {
    fn default() -> Self {
        TypeMapping::postgres()
    }
}
