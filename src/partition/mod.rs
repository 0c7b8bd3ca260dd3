//! Partitioning of the unified table by resource type
//!
//! Each partition keeps only the columns that carry at least one value for
//! its resource type, and every kept column is tagged with an inferred type.

pub mod inference;
pub mod partitioner;

pub use inference::{coerce, infer_column_type, ColumnType};
pub use partitioner::{partition_table, Column, Partition, Partitioned};
