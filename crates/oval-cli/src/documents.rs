//! # Document Loading
//!
//! Reads the JSON documents the evaluator consumes. Every failure names the
//! file it came from.

use std::path::Path;

use anyhow::{Context, Result};
use oval_core::{DefinitionSet, ExternalVariables, SystemCharacteristics};
use serde::de::DeserializeOwned;

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {what}: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {what}: {}", path.display()))
}

/// Load a definitions document. Duplicate identifiers are rejected.
pub fn load_definitions(path: &Path) -> Result<DefinitionSet> {
    let definitions: DefinitionSet = read_json(path, "definitions")?;
    tracing::info!(
        path = %path.display(),
        definitions = definitions.definition_count(),
        "loaded definitions"
    );
    Ok(definitions)
}

/// Load a system-characteristics document.
pub fn load_characteristics(path: &Path) -> Result<SystemCharacteristics> {
    let store: SystemCharacteristics = read_json(path, "system characteristics")?;
    tracing::info!(
        path = %path.display(),
        objects = store.object_count(),
        items = store.item_count(),
        "loaded system characteristics"
    );
    Ok(store)
}

/// Load external variable values, or an empty set when no file is given.
pub fn load_variables(path: Option<&Path>) -> Result<ExternalVariables> {
    match path {
        Some(path) => {
            let variables: ExternalVariables = read_json(path, "external variables")?;
            tracing::info!(path = %path.display(), variables = variables.len(), "loaded external variables");
            Ok(variables)
        }
        None => Ok(ExternalVariables::new()),
    }
}
