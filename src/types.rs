use indexmap::IndexSet;
use serde_json::Value;

/// A single value in a flattened table
///
/// Nested arrays and objects are kept as their JSON text (`Opaque`) so that
/// nothing downstream has to deal with a value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Opaque(String),
}

impl Cell {
    /// Convert a JSON value into a cell. Arrays and objects become opaque.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Cell::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Cell::Float(f)
                } else {
                    Cell::Text(n.to_string())
                }
            }
            Value::String(s) => Cell::Text(s),
            nested @ (Value::Array(_) | Value::Object(_)) => Cell::Opaque(nested.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Cell::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(f) => Some(*f),
            Cell::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Borrow the text of a `Text` or `Opaque` cell
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) | Cell::Opaque(s) => Some(s),
            _ => None,
        }
    }
}

/// Row-major table with a union column set
///
/// Every row always has exactly one cell per column; adding a column pads the
/// existing rows with `Cell::Null`.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: IndexSet<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new() -> Self {
        Table::default()
    }

    pub fn columns(&self) -> &IndexSet<String> {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Cell at `(row, column)`, or `None` when out of bounds
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    fn ensure_column(&mut self, name: String) -> usize {
        let (idx, inserted) = self.columns.insert_full(name);
        if inserted {
            for row in &mut self.rows {
                row.push(Cell::Null);
            }
        }
        idx
    }

    /// Append one record. A key seen twice keeps its last value.
    pub fn push_record(&mut self, record: Vec<(String, Cell)>) {
        let positioned: Vec<(usize, Cell)> = record
            .into_iter()
            .map(|(name, cell)| (self.ensure_column(name), cell))
            .collect();

        let mut row = vec![Cell::Null; self.columns.len()];
        for (idx, cell) in positioned {
            row[idx] = cell;
        }
        self.rows.push(row);
    }

    /// Union-concatenate `other` below `self`, matching columns by name
    pub fn append(&mut self, other: Table) {
        let mapping: Vec<usize> = other
            .columns
            .into_iter()
            .map(|name| self.ensure_column(name))
            .collect();

        let width = self.columns.len();
        self.rows.reserve(other.rows.len());
        for source in other.rows {
            let mut row = vec![Cell::Null; width];
            for (cell, &idx) in source.into_iter().zip(&mapping) {
                row[idx] = cell;
            }
            self.rows.push(row);
        }
    }

    /// Decompose into the column list and rows
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Cell>>) {
        (self.columns.into_iter().collect(), self.rows)
    }
}

/// Configuration for flattening bundle entries
#[derive(Debug, Clone)]
pub struct FlattenConfig {
    /// Top-level field holding the array of records
    pub record_path: String,

    /// Number of object levels below the record root that are expanded into
    /// columns; objects deeper than this stay opaque
    pub max_level: usize,

    /// Separator for joined column names
    pub separator: String,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        FlattenConfig {
            record_path: String::from("entry"),
            max_level: 2,
            separator: String::from("_"),
        }
    }
}
