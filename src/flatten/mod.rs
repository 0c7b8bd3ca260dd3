//! Bundle flattening - turn FHIR bundle files into one unified table
//!
//! Each entry of a bundle's `entry` array becomes a row. Nested objects are
//! expanded into `_`-joined columns up to a fixed depth; arrays and deeper
//! objects are stored as JSON text.

pub mod collector;
pub mod flattener;
pub mod reader;

pub use collector::{collect_directory, list_bundle_files};
pub use flattener::Flattener;
pub use reader::read_bundle;
