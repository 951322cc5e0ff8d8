//! JSON persistence for plans

use super::Plan;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A plan document that does not have the expected shape
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("malformed plan: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("plan has no items")]
    EmptyItems,

    #[error("plan field '{field}' is blank")]
    BlankField { field: String },
}

/// Errors reading or writing a plan file
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read plan {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write plan {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("invalid plan {path}: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },
}

/// Check the invariants serde cannot express
fn validate(plan: &Plan) -> Result<(), SchemaError> {
    if plan.head.trim().is_empty() {
        return Err(SchemaError::BlankField {
            field: "head".into(),
        });
    }
    if plan.items.is_empty() {
        return Err(SchemaError::EmptyItems);
    }
    for (index, item) in plan.items.iter().enumerate() {
        if item.sha.trim().is_empty() {
            return Err(SchemaError::BlankField {
                field: format!("items[{index}].sha"),
            });
        }
    }
    Ok(())
}

/// Serialize a plan as pretty-printed JSON
pub fn to_json(plan: &Plan) -> Result<String, SchemaError> {
    validate(plan)?;
    Ok(serde_json::to_string_pretty(plan)?)
}

/// Parse and validate a plan document
pub fn from_json(text: &str) -> Result<Plan, SchemaError> {
    let plan: Plan = serde_json::from_str(text)?;
    validate(&plan)?;
    Ok(plan)
}

/// Write `plan` to `path`, replacing any previous plan there
pub fn save(plan: &Plan, path: &Path) -> Result<(), StoreError> {
    let json = to_json(plan).map_err(|source| StoreError::Schema {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, json + "\n").map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a plan from `path`
pub fn load(path: &Path) -> Result<Plan, StoreError> {
    let text = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    from_json(&text).map_err(|source| StoreError::Schema {
        path: path.to_path_buf(),
        source,
    })
}
