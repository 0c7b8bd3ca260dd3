use crate::error::{LoaderError, Result};
use crate::flatten::{read_bundle, Flattener};
use crate::types::Table;
use std::path::{Path, PathBuf};

/// List the `*.json` files directly inside `dir`, sorted by file name
pub fn list_bundle_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| LoaderError::malformed(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LoaderError::malformed(dir, e))?;
        let path = entry.path();
        let is_json = path.extension().map_or(false, |ext| ext == "json");
        if is_json && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Read and flatten every bundle in `dir` into one unified table
pub fn collect_directory(dir: &Path, flattener: &Flattener) -> Result<Table> {
    let files = list_bundle_files(dir)?;
    if files.is_empty() {
        return Err(LoaderError::EmptyInput(format!(
            "no .json files found in {}",
            dir.display()
        )));
    }

    let mut combined = Table::new();
    for path in &files {
        let bundle = read_bundle(path)?;
        let table = flattener.flatten(bundle)?;
        tracing::debug!(
            file = %path.display(),
            rows = table.len(),
            columns = table.width(),
            "Flattened bundle"
        );
        combined.append(table);
    }

    if combined.is_empty() {
        return Err(LoaderError::EmptyInput(format!(
            "{} bundle file(s) in {} contain no entries",
            files.len(),
            dir.display()
        )));
    }

    tracing::info!(
        files = files.len(),
        rows = combined.len(),
        columns = combined.width(),
        "Collected bundles"
    );

    Ok(combined)
}
