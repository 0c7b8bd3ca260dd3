//! Load orchestration: collect, partition, provision, then create and fill
//! one table per allowed resource type

use crate::config::{DatabaseSettings, LoaderConfig};
use crate::error::{LoaderError, Result};
use crate::flatten::{collect_directory, Flattener};
use crate::partition::{partition_table, Partition};
use crate::sql::{create_table_sql, ensure_database, load_table, Provisioned};

/// Partitions ready to be written, in load order
#[derive(Debug)]
pub struct PreparedLoad {
    /// Allowed partitions, ordered like the configured resource types
    pub tables: Vec<Partition>,

    /// Rows in the unified table
    pub total_rows: usize,

    /// Resource types outside the allow-list, with their row counts
    pub discarded: Vec<(String, usize)>,

    /// Rows without a resource type
    pub unclassified: usize,
}

/// Outcome of loading one table
#[derive(Debug)]
pub struct TableOutcome {
    pub table: String,

    /// Rows in the partition
    pub rows: usize,

    /// Inserted row count, or why the table failed
    pub result: Result<u64>,
}

/// Per-table results of a load run
#[derive(Debug)]
pub struct LoadReport {
    pub provisioned: Provisioned,
    pub outcomes: Vec<TableOutcome>,
}

impl LoadReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &LoaderError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.table.as_str(), e)))
    }

    pub fn first_failure(&self) -> Option<&LoaderError> {
        self.failures().next().map(|(_, e)| e)
    }

    pub fn loaded_rows(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .sum()
    }
}

pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Result<Self> {
        config.validate()?;

        let unmapped = config.type_mapping.unmapped();
        if !unmapped.is_empty() {
            let names: Vec<&str> = unmapped.iter().map(|ty| ty.as_str()).collect();
            tracing::warn!(
                types = %names.join(", "),
                "Type mapping is incomplete, tables with these column types will fail"
            );
        }

        Ok(Loader { config })
    }

    /// Collect the data directory and keep the allowed partitions
    pub fn prepare(&self) -> Result<PreparedLoad> {
        let flattener = Flattener::new(self.config.flatten.clone());
        let table = collect_directory(&self.config.data_dir, &flattener)?;
        let total_rows = table.len();

        let mut partitioned = partition_table(table, &self.config.discriminator())?;

        let mut tables = Vec::new();
        for resource_type in &self.config.resource_types {
            match partitioned.take(resource_type) {
                Some(partition) => tables.push(partition),
                None => tracing::warn!(
                    resource_type = %resource_type,
                    "No entries of this resource type, skipping table"
                ),
            }
        }

        let discarded: Vec<(String, usize)> = partitioned
            .partitions
            .iter()
            .map(|p| (p.resource_type.clone(), p.len()))
            .collect();
        for (resource_type, rows) in &discarded {
            tracing::debug!(resource_type = %resource_type, rows, "Discarding resource type not in allow-list");
        }

        Ok(PreparedLoad {
            tables,
            total_rows,
            discarded,
            unclassified: partitioned.unclassified,
        })
    }

    /// `CREATE TABLE` statements for the prepared partitions
    pub fn create_statements(&self, prepared: &PreparedLoad) -> Result<Vec<(String, String)>> {
        prepared
            .tables
            .iter()
            .map(|p| {
                create_table_sql(&p.resource_type, &p.columns, &self.config.type_mapping)
                    .map(|sql| (p.resource_type.clone(), sql))
            })
            .collect()
    }

    /// Provision the database and load each prepared table in turn.
    ///
    /// A failing table is recorded in the report and the next table is still
    /// attempted; only a provisioning failure aborts.
    pub async fn load(
        &self,
        prepared: &PreparedLoad,
        settings: &DatabaseSettings,
    ) -> Result<LoadReport> {
        settings.validate()?;
        let provisioned = ensure_database(settings).await?;

        let mut outcomes = Vec::with_capacity(prepared.tables.len());
        for partition in &prepared.tables {
            let table = partition.resource_type.clone();
            let result =
                load_table(settings, &table, partition, &self.config.type_mapping).await;

            match &result {
                Ok(inserted) => tracing::info!(table = %table, rows = inserted, "Table loaded"),
                Err(e) => tracing::error!(
                    table = %table,
                    kind = e.kind(),
                    error = %e,
                    "Table load failed"
                ),
            }

            outcomes.push(TableOutcome {
                table,
                rows: partition.len(),
                result,
            });
        }

        Ok(LoadReport {
            provisioned,
            outcomes,
        })
    }

    /// Prepare and load in one go
    pub async fn run(&self, settings: &DatabaseSettings) -> Result<LoadReport> {
        let prepared = self.prepare()?;
        self.load(&prepared, settings).await
    }
}
