use crate::error::{LoaderError, Result};
use crate::partition::inference::{coerce, infer_column_type, ColumnType};
use crate::types::{Cell, Table};
use indexmap::IndexMap;

/// A retained partition column and its inferred type
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

/// Rows of one resource type, restricted to columns with values
#[derive(Debug, Clone)]
pub struct Partition {
    /// Discriminator value shared by every row (e.g. "Patient")
    pub resource_type: String,

    /// Retained columns, in unified-table order
    pub columns: Vec<Column>,

    /// Rows with one coerced cell per retained column
    pub rows: Vec<Vec<Cell>>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Result of splitting the unified table
#[derive(Debug)]
pub struct Partitioned {
    /// Partitions in order of first appearance of their resource type
    pub partitions: Vec<Partition>,

    /// Rows whose discriminator was null
    pub unclassified: usize,
}

impl Partitioned {
    pub fn get(&self, resource_type: &str) -> Option<&Partition> {
        self.partitions
            .iter()
            .find(|p| p.resource_type == resource_type)
    }

    /// Remove and return the partition for `resource_type`
    pub fn take(&mut self, resource_type: &str) -> Option<Partition> {
        let idx = self
            .partitions
            .iter()
            .position(|p| p.resource_type == resource_type)?;
        Some(self.partitions.remove(idx))
    }

    pub fn total_rows(&self) -> usize {
        self.partitions.iter().map(Partition::len).sum::<usize>() + self.unclassified
    }
}

fn discriminator_key(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Null => None,
        Cell::Text(s) | Cell::Opaque(s) => Some(s.clone()),
        Cell::Bool(b) => Some(b.to_string()),
        Cell::Int(i) => Some(i.to_string()),
        Cell::Float(f) => Some(f.to_string()),
    }
}

/// Split `table` into one partition per value of the `discriminator` column
pub fn partition_table(table: Table, discriminator: &str) -> Result<Partitioned> {
    let key_idx = table.column_index(discriminator).ok_or_else(|| {
        LoaderError::SchemaMismatch(format!(
            "discriminator column `{}` not found in flattened data",
            discriminator
        ))
    })?;

    let (columns, rows) = table.into_parts();

    let mut groups: IndexMap<String, Vec<Vec<Cell>>> = IndexMap::new();
    let mut unclassified = 0;
    for row in rows {
        match discriminator_key(&row[key_idx]) {
            Some(key) => groups.entry(key).or_default().push(row),
            None => unclassified += 1,
        }
    }

    if unclassified > 0 {
        tracing::warn!(
            rows = unclassified,
            discriminator,
            "Rows without a resource type are not assigned to any partition"
        );
    }

    let partitions = groups
        .into_iter()
        .map(|(resource_type, rows)| build_partition(resource_type, &columns, rows))
        .collect();

    Ok(Partitioned {
        partitions,
        unclassified,
    })
}

fn build_partition(resource_type: String, names: &[String], rows: Vec<Vec<Cell>>) -> Partition {
    // (source index, column) for every column with at least one value
    let retained: Vec<(usize, Column)> = names
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            infer_column_type(rows.iter().map(|row| &row[idx])).map(|column_type| {
                (
                    idx,
                    Column {
                        name: name.clone(),
                        column_type,
                    },
                )
            })
        })
        .collect();

    let rows: Vec<Vec<Cell>> = rows
        .into_iter()
        .map(|mut row| {
            retained
                .iter()
                .map(|(idx, column)| {
                    let cell = std::mem::replace(&mut row[*idx], Cell::Null);
                    coerce(cell, column.column_type)
                })
                .collect()
        })
        .collect();

    tracing::debug!(
        resource_type = %resource_type,
        rows = rows.len(),
        columns = retained.len(),
        dropped = names.len() - retained.len(),
        "Built partition"
    );

    Partition {
        resource_type,
        columns: retained.into_iter().map(|(_, column)| column).collect(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::Flattener;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const DISCRIMINATOR: &str = "resource_resourceType";

    fn sample_table() -> Table {
        Flattener::default()
            .flatten(json!({
                "entry": [
                    {"resource": {"resourceType": "Patient", "id": "p1", "active": true, "multipleBirthInteger": 1}},
                    {"resource": {"resourceType": "Encounter", "id": "e1", "period": {"start": "2020-01-01"}}},
                    {"resource": {"resourceType": "Patient", "id": "p2", "active": false, "multipleBirthInteger": 2.0}},
                    {"resource": {"id": "orphan"}},
                    {"resource": {"resourceType": "Encounter", "id": "e2", "class": {"code": "AMB"}, "length": 1.5}}
                ]
            }))
            .unwrap()
    }

    #[test]
    fn test_partitions_in_first_seen_order() {
        let partitioned = partition_table(sample_table(), DISCRIMINATOR).unwrap();

        let types: Vec<&str> = partitioned
            .partitions
            .iter()
            .map(|p| p.resource_type.as_str())
            .collect();
        assert_eq!(types, vec!["Patient", "Encounter"]);
        assert_eq!(partitioned.unclassified, 1);
    }

    #[test]
    fn test_partitioning_is_lossless_cover() {
        let table = sample_table();
        let total = table.len();
        let partitioned = partition_table(table, DISCRIMINATOR).unwrap();

        assert_eq!(partitioned.total_rows(), total);

        let ids: Vec<String> = partitioned
            .partitions
            .iter()
            .flat_map(|p| {
                let idx = p.column_names().iter().position(|c| *c == "resource_id").unwrap();
                p.rows.iter().map(move |r| r[idx].as_str().unwrap().to_string())
            })
            .collect();
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_drops_exactly_all_null_columns() {
        let partitioned = partition_table(sample_table(), DISCRIMINATOR).unwrap();

        let patient = partitioned.get("Patient").unwrap();
        assert_eq!(
            patient.column_names(),
            vec![
                "resource_resourceType",
                "resource_id",
                "resource_active",
                "resource_multipleBirthInteger"
            ]
        );

        let encounter = partitioned.get("Encounter").unwrap();
        // `resource_class_code` and `resource_length` are only set on e2 but still kept
        assert_eq!(
            encounter.column_names(),
            vec![
                "resource_resourceType",
                "resource_id",
                "resource_period_start",
                "resource_class_code",
                "resource_length"
            ]
        );
        assert!(encounter.rows.iter().all(|r| r.len() == encounter.columns.len()));
    }

    #[test]
    fn test_column_types_and_coercion() {
        let partitioned = partition_table(sample_table(), DISCRIMINATOR).unwrap();
        let patient = partitioned.get("Patient").unwrap();

        assert_eq!(
            patient.column("resource_active").unwrap().column_type,
            ColumnType::Boolean
        );
        assert_eq!(
            patient.column("resource_multipleBirthInteger").unwrap().column_type,
            ColumnType::Int8
        );
        // 2.0 was coerced to an integer
        assert_eq!(patient.rows[1][3], Cell::Int(2));

        let encounter = partitioned.get("Encounter").unwrap();
        assert_eq!(
            encounter.column("resource_length").unwrap().column_type,
            ColumnType::Float64
        );
        assert_eq!(
            encounter.column("resource_period_start").unwrap().column_type,
            ColumnType::Text
        );
    }

    #[test]
    fn test_nested_values_make_opaque_columns() {
        let table = Flattener::default()
            .flatten(json!({
                "entry": [
                    {"resource": {"resourceType": "Condition", "code": {"coding": [{"code": "a"}]}}},
                    {"resource": {"resourceType": "Condition", "code": {"coding": "plain"}}}
                ]
            }))
            .unwrap();

        let partitioned = partition_table(table, DISCRIMINATOR).unwrap();
        let condition = partitioned.get("Condition").unwrap();
        let column = condition.column("resource_code_coding").unwrap();

        assert_eq!(column.column_type, ColumnType::Opaque);
        assert_eq!(condition.rows[1][1], Cell::Opaque("\"plain\"".into()));
    }

    #[test]
    fn test_missing_discriminator_is_schema_mismatch() {
        let table = Flattener::default()
            .flatten(json!({"entry": [{"resource": {"id": "x"}}]}))
            .unwrap();

        let err = partition_table(table, DISCRIMINATOR).unwrap_err();
        assert!(matches!(err, LoaderError::SchemaMismatch(_)));
    }

    #[test]
    fn test_take_removes_partition() {
        let mut partitioned = partition_table(sample_table(), DISCRIMINATOR).unwrap();

        let patient = partitioned.take("Patient").unwrap();
        assert_eq!(patient.len(), 2);
        assert!(partitioned.get("Patient").is_none());
        assert!(partitioned.take("Device").is_none());
    }
}
