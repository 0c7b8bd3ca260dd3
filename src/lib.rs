//! # fhir-loader - FHIR bundles into PostgreSQL tables
//!
//! Reads a directory of FHIR bundle JSON files, flattens every bundle entry
//! into a row, splits the rows by resource type and bulk-loads each resource
//! type into its own PostgreSQL table with inferred column types.
//!
//! ## Modules
//!
//! - **flatten**: read bundles and flatten their entries into one table
//! - **partition**: split by resource type and infer column types
//! - **sql**: type mapping, DDL/INSERT generation, provisioning and loading
//! - **loader**: the orchestrator tying the steps together
//!
//! ## Quick Start
//!
//! ```rust
//! use fhir_loader::{partition_table, Flattener};
//! use serde_json::json;
//!
//! # fn main() -> fhir_loader::Result<()> {
//! let bundle = json!({
//!     "resourceType": "Bundle",
//!     "entry": [
//!         {"resource": {"resourceType": "Patient", "id": "p1", "gender": "female"}},
//!         {"resource": {"resourceType": "Encounter", "id": "e1", "class": {"code": "AMB"}}}
//!     ]
//! });
//!
//! let table = Flattener::default().flatten(bundle)?;
//! let partitioned = partition_table(table, "resource_resourceType")?;
//!
//! // partitioned.partitions[0] = Patient (resource_resourceType, resource_id, resource_gender)
//! // partitioned.partitions[1] = Encounter (resource_resourceType, resource_id, resource_class_code)
//! assert_eq!(partitioned.partitions.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod flatten;
pub mod loader;
pub mod logging;
pub mod partition;
pub mod sql;
pub mod types;

// Re-export commonly used types for convenience
pub use config::{DatabaseSettings, LoaderConfig, DEFAULT_RESOURCE_TYPES};
pub use error::{LoaderError, Result};
pub use flatten::{collect_directory, read_bundle, Flattener};
pub use loader::{LoadReport, Loader, PreparedLoad, TableOutcome};
pub use partition::{partition_table, Column, ColumnType, Partition, Partitioned};
pub use sql::{Provisioned, TypeMapping};
pub use types::{Cell, FlattenConfig, Table};
