// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task payload validation, applied before a task is persisted.

use crate::error::ValidationError;
use crate::task::{IoType, TaskRequest};

/// Whether a path contains POSIX glob metacharacters (`*`, `?`, `[`).
pub fn has_wildcard(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

/// Validate a submitted task. Returns the first violation found.
pub fn validate_task(req: &TaskRequest) -> Result<(), ValidationError> {
    if req.executors.is_empty() {
        return Err(ValidationError("task requires at least one executor".to_string()));
    }

    for (i, exec) in req.executors.iter().enumerate() {
        if exec.image.is_empty() {
            return Err(ValidationError(format!("executors[{i}].image must be set")));
        }
        if exec.command.is_empty() {
            return Err(ValidationError(format!("executors[{i}].command must be non-empty")));
        }
        for (field, value) in [
            ("workdir", &exec.workdir),
            ("stdin", &exec.stdin),
            ("stdout", &exec.stdout),
            ("stderr", &exec.stderr),
        ] {
            if let Some(path) = value {
                if !path.starts_with('/') {
                    return Err(ValidationError(format!(
                        "executors[{i}].{field} must be an absolute path"
                    )));
                }
            }
        }
    }

    for (i, input) in req.inputs.iter().enumerate() {
        match (&input.url, &input.content) {
            (Some(_), Some(_)) => {
                return Err(ValidationError(format!(
                    "inputs[{i}]: url and content are mutually exclusive"
                )));
            }
            (None, None) => {
                return Err(ValidationError(format!(
                    "inputs[{i}]: one of url or content is required"
                )));
            }
            (None, Some(_)) if input.r#type == IoType::Directory => {
                return Err(ValidationError(format!(
                    "inputs[{i}]: content cannot populate a DIRECTORY input"
                )));
            }
            _ => {}
        }
        if !input.path.starts_with('/') {
            return Err(ValidationError(format!("inputs[{i}].path must be an absolute path")));
        }
    }

    for (i, output) in req.outputs.iter().enumerate() {
        if output.url.is_empty() {
            return Err(ValidationError(format!("outputs[{i}].url must be set")));
        }
        if !output.path.starts_with('/') {
            return Err(ValidationError(format!("outputs[{i}].path must be an absolute path")));
        }
        if has_wildcard(&output.path) && output.path_prefix.is_none() {
            return Err(ValidationError(format!(
                "outputs[{i}]: path_prefix is required when path contains wildcards"
            )));
        }
        if let Some(prefix) = &output.path_prefix {
            if !prefix.starts_with('/') {
                return Err(ValidationError(format!(
                    "outputs[{i}].path_prefix must be an absolute path"
                )));
            }
        }
    }

    for (i, volume) in req.volumes.iter().enumerate() {
        if !volume.starts_with('/') {
            return Err(ValidationError(format!("volumes[{i}] must be an absolute path")));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
