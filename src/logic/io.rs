// Input/output logic.
use std::{fs, path::Path};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::logic::error::Result;

// Read a JSON file into the given type.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!(path = %path.display(), "reading JSON file");
    let json = fs::read_to_string(path)?;
    return Ok(serde_json::from_str(&json)?);
}
