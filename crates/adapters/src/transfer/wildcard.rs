// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output expansion: wildcard matching against the task volume and
//! destination URL construction.
//!
//! Patterns use the POSIX basic set (`*`, `?`, `[set]`). The emitted
//! URL for a match is the output's (directory) URL joined with the match
//! pruned of `path_prefix`.

use std::path::{Path, PathBuf};

use poiesis_core::validate::has_wildcard;
use poiesis_core::{IoType, Output};

use super::{join_url, walk_files, TransferError};

/// One file to upload: local source and fully-formed destination URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMatch {
    pub source: PathBuf,
    pub url: String,
}

/// Resolve an output declaration to the concrete files it names.
///
/// - A plain `FILE` path yields exactly one upload to `output.url`.
/// - A plain `DIRECTORY` path yields one upload per file underneath it,
///   to `output.url` joined with the file's path relative to the root.
/// - A wildcard path yields one upload per match, to `output.url` joined
///   with the match minus `path_prefix`.
pub fn expand_output(output: &Output) -> Result<Vec<OutputMatch>, TransferError> {
    if has_wildcard(&output.path) {
        return expand_pattern(output);
    }
    let path = Path::new(&output.path);
    match output.r#type {
        IoType::File => {
            Ok(vec![OutputMatch { source: path.to_path_buf(), url: output.url.clone() }])
        }
        IoType::Directory => {
            let files = walk_files(path)?;
            Ok(files
                .into_iter()
                .map(|source| {
                    let relative = source
                        .strip_prefix(path)
                        .unwrap_or(&source)
                        .to_string_lossy()
                        .into_owned();
                    let url = join_url(&output.url, &relative);
                    OutputMatch { source, url }
                })
                .collect())
        }
    }
}

fn expand_pattern(output: &Output) -> Result<Vec<OutputMatch>, TransferError> {
    // path_prefix presence is enforced at submission time
    let prefix = output.path_prefix.as_deref().unwrap_or("/");
    let mut matches = Vec::new();
    let paths = glob::glob(&output.path)
        .map_err(|e| TransferError::Unavailable(format!("bad pattern {:?}: {e}", output.path)))?;
    for entry in paths {
        let source = entry.map_err(|e| TransferError::Io(e.into_error()))?;
        if !source.is_file() {
            continue;
        }
        let relative = source
            .strip_prefix(prefix)
            .unwrap_or(&source)
            .to_string_lossy()
            .into_owned();
        let url = join_url(&output.url, &relative);
        matches.push(OutputMatch { source, url });
    }
    matches.sort_by(|a, b| a.source.cmp(&b.source));
    Ok(matches)
}

#[cfg(test)]
#[path = "wildcard_tests.rs"]
mod tests;
