//! Loader configuration

use crate::error::{LoaderError, Result};
use crate::sql::TypeMapping;
use crate::types::FlattenConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::postgres::PgConnectOptions;
use std::fmt;
use std::path::PathBuf;

/// Resource types that are materialized as tables by default
pub const DEFAULT_RESOURCE_TYPES: [&str; 13] = [
    "Encounter",
    "Patient",
    "Condition",
    "DiagnosticReport",
    "ExplanationOfBenefit",
    "MedicationRequest",
    "CareTeam",
    "CarePlan",
    "Procedure",
    "Immunization",
    "Observation",
    "Provenance",
    "Device",
];

// FHIR resource type names are ASCII PascalCase
static RESOURCE_TYPE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Za-z0-9]*$").expect("valid resource type regex"));

/// Connection settings for the target PostgreSQL server
#[derive(Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,

    /// Database that receives the tables
    pub database: String,

    /// Database used to check for and create the target database
    pub admin_database: String,
}

impl DatabaseSettings {
    pub fn new(
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        DatabaseSettings {
            host: String::from("localhost"),
            port: 5432,
            user: user.into(),
            password: password.into(),
            database: database.into(),
            admin_database: String::from("postgres"),
        }
    }

    pub fn connect_options(&self, database: &str) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(database)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(LoaderError::Config("database name is empty".into()));
        }
        if self.user.is_empty() {
            return Err(LoaderError::Config("database user is empty".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("admin_database", &self.admin_database)
            .finish()
    }
}

/// Configuration for a load run
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Directory holding the bundle files
    pub data_dir: PathBuf,

    pub flatten: FlattenConfig,

    /// Resource types to materialize, in load order
    pub resource_types: Vec<String>,

    pub type_mapping: TypeMapping,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            data_dir: PathBuf::from("data"),
            flatten: FlattenConfig::default(),
            resource_types: DEFAULT_RESOURCE_TYPES.iter().map(|s| s.to_string()).collect(),
            type_mapping: TypeMapping::postgres(),
        }
    }
}

impl LoaderConfig {
    /// Flattened column holding each entry's resource type
    pub fn discriminator(&self) -> String {
        format!("resource{}resourceType", self.flatten.separator)
    }

    pub fn validate(&self) -> Result<()> {
        if self.flatten.max_level == 0 {
            return Err(LoaderError::Config(
                "max level must be at least 1 to reach the resource type".into(),
            ));
        }
        if self.flatten.separator.is_empty() {
            return Err(LoaderError::Config("separator is empty".into()));
        }
        if self.resource_types.is_empty() {
            return Err(LoaderError::Config("no resource types selected".into()));
        }
        if let Some(bad) = self
            .resource_types
            .iter()
            .find(|t| !RESOURCE_TYPE_REGEX.is_match(t))
        {
            return Err(LoaderError::Config(format!(
                "`{}` is not a valid resource type name",
                bad
            )));
        }
        Ok(())
    }
}
