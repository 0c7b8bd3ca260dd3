use crate::error::{LoaderError, Result};
use serde_json::Value;
use std::path::Path;

/// Read and parse one bundle file.
///
/// Parsing goes through simd-json, which needs a mutable buffer. Integer
/// literals beyond the 64-bit range are read as floats.
pub fn read_bundle(path: &Path) -> Result<Value> {
    let mut content = std::fs::read(path).map_err(|e| LoaderError::malformed(path, e))?;

    simd_json::serde::from_slice::<Value>(&mut content)
        .map_err(|e| LoaderError::malformed(path, e))
}
