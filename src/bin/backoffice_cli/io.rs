#![deny(clippy::all, clippy::pedantic)]

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::client::CliError;

fn input_error(path: &Path, source: std::io::Error) -> CliError {
    CliError::InputFile {
        path: path.display().to_string(),
        source,
    }
}

pub fn read_text(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| input_error(path, source))
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|source| input_error(path, source))
}

/// Parse a record payload; only JSON objects are accepted.
pub fn read_json_object(path: &Path) -> Result<Value, CliError> {
    let raw = read_text(path)?;
    let value: Value = serde_json::from_str(&raw).map_err(|e| {
        CliError::InvalidInput(format!("{} is not valid JSON: {e}", path.display()))
    })?;
    if !value.is_object() {
        return Err(CliError::InvalidInput(format!(
            "{} must contain a JSON object",
            path.display()
        )));
    }
    Ok(value)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload.bin")
        .to_string()
}
