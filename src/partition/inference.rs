//! Column type inference
//!
//! Types are inferred with a single accumulating pass over a column's cells;
//! the final type is resolved once from the collected counts. The result only
//! depends on the multiset of values, so it is independent of row order.

use crate::types::Cell;
use std::fmt;

/// Inferred type of a partition column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float64,
    Text,
    /// Nested array/object content, stored as JSON text
    Opaque,
}

impl ColumnType {
    pub const ALL: [ColumnType; 8] = [
        ColumnType::Boolean,
        ColumnType::Int8,
        ColumnType::Int16,
        ColumnType::Int32,
        ColumnType::Int64,
        ColumnType::Float64,
        ColumnType::Text,
        ColumnType::Opaque,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Boolean => "boolean",
            ColumnType::Int8 => "int8",
            ColumnType::Int16 => "int16",
            ColumnType::Int32 => "int32",
            ColumnType::Int64 => "int64",
            ColumnType::Float64 => "float64",
            ColumnType::Text => "text",
            ColumnType::Opaque => "opaque",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ColumnType::Int8 | ColumnType::Int16 | ColumnType::Int32 | ColumnType::Int64
        )
    }

    /// Smallest integer tier holding every value in `min..=max`
    pub fn integer_tier(min: i64, max: i64) -> ColumnType {
        let fits = |lo: i64, hi: i64| min >= lo && max <= hi;
        if fits(i8::MIN.into(), i8::MAX.into()) {
            ColumnType::Int8
        } else if fits(i16::MIN.into(), i16::MAX.into()) {
            ColumnType::Int16
        } else if fits(i32::MIN.into(), i32::MAX.into()) {
            ColumnType::Int32
        } else {
            ColumnType::Int64
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// i64 bounds as floats; 2^63 is the first value out of range
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

/// Integer value of a cell, if it holds one exactly
fn integral_value(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Int(i) => Some(*i),
        Cell::Float(f) if f.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(f) => {
            Some(*f as i64)
        }
        _ => None,
    }
}

/// Accumulated statistics about one column
#[derive(Debug, Default)]
struct ColumnStats {
    non_null: usize,
    bools: usize,
    integrals: usize,
    floats: usize,
    opaques: usize,
    min: Option<i64>,
    max: Option<i64>,
}

impl ColumnStats {
    fn add(&mut self, cell: &Cell) {
        if cell.is_null() {
            return;
        }
        self.non_null += 1;

        if let Some(i) = integral_value(cell) {
            self.integrals += 1;
            self.min = Some(self.min.map_or(i, |m| m.min(i)));
            self.max = Some(self.max.map_or(i, |m| m.max(i)));
            return;
        }

        match cell {
            Cell::Bool(_) => self.bools += 1,
            Cell::Float(_) => self.floats += 1,
            Cell::Opaque(_) => self.opaques += 1,
            _ => {}
        }
    }

    fn resolve(&self) -> Option<ColumnType> {
        if self.non_null == 0 {
            return None;
        }

        let ty = if self.opaques > 0 {
            ColumnType::Opaque
        } else if self.bools == self.non_null {
            ColumnType::Boolean
        } else if self.integrals == self.non_null {
            match (self.min, self.max) {
                (Some(min), Some(max)) => ColumnType::integer_tier(min, max),
                _ => ColumnType::Int64,
            }
        } else if self.integrals + self.floats == self.non_null {
            ColumnType::Float64
        } else {
            ColumnType::Text
        };

        Some(ty)
    }
}

/// Infer the type of a column from its cells. Returns `None` when every cell
/// is null.
pub fn infer_column_type<'a, I>(cells: I) -> Option<ColumnType>
where
    I: IntoIterator<Item = &'a Cell>,
{
    let mut stats = ColumnStats::default();
    for cell in cells {
        stats.add(cell);
    }
    stats.resolve()
}

/// Convert a cell to the representation of `column_type`.
///
/// The type must come from `infer_column_type` over a set of cells containing
/// this one; nulls always stay null.
pub fn coerce(cell: Cell, column_type: ColumnType) -> Cell {
    if cell.is_null() {
        return cell;
    }

    match column_type {
        ColumnType::Boolean => cell,
        ColumnType::Int8 | ColumnType::Int16 | ColumnType::Int32 | ColumnType::Int64 => {
            match integral_value(&cell) {
                Some(i) => Cell::Int(i),
                None => cell,
            }
        }
        ColumnType::Float64 => match cell.as_f64() {
            Some(f) => Cell::Float(f),
            None => cell,
        },
        ColumnType::Text => match cell {
            Cell::Bool(b) => Cell::Text(b.to_string()),
            Cell::Int(i) => Cell::Text(i.to_string()),
            Cell::Float(f) => Cell::Text(f.to_string()),
            other => other,
        },
        ColumnType::Opaque => match cell {
            Cell::Opaque(_) => cell,
            Cell::Bool(b) => Cell::Opaque(b.to_string()),
            Cell::Int(i) => Cell::Opaque(i.to_string()),
            Cell::Float(f) => Cell::Opaque(
                serde_json::Number::from_f64(f)
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "null".to_string()),
            ),
            Cell::Text(s) => Cell::Opaque(serde_json::Value::String(s).to_string()),
            Cell::Null => Cell::Null,
        },
    }
}
