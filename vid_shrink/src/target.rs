//! Source/destination pair of one shrink run

use crate::errors::{Result, ShrinkError};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompressionTarget {
    input: PathBuf,
    output: PathBuf,
    in_place: bool,
}

impl CompressionTarget {
    /// `output = None` means "overwrite the input".
    pub fn new(input: impl Into<PathBuf>, output: Option<PathBuf>) -> Self {
        let input = input.into();
        let output = output.unwrap_or_else(|| input.clone());
        let in_place = same_location(&input, &output);
        Self {
            input,
            output,
            in_place,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Destination resolves to the source file
    pub fn is_in_place(&self) -> bool {
        self.in_place
    }

    pub fn ensure_input_exists(&self) -> Result<()> {
        if self.input.is_file() {
            Ok(())
        } else {
            Err(ShrinkError::InputNotFound(self.input.clone()))
        }
    }
}

/// Compares two paths by where they point, not by spelling.
///
/// `output` may not exist yet, so its parent is resolved instead.
fn same_location(input: &Path, output: &Path) -> bool {
    if input == output {
        return true;
    }
    match (input.canonicalize(), resolve_maybe_missing(output)) {
        (Ok(a), Some(b)) => a == b,
        _ => false,
    }
}

fn resolve_maybe_missing(path: &Path) -> Option<PathBuf> {
    if let Ok(resolved) = path.canonicalize() {
        return Some(resolved);
    }
    let file_name = path.file_name()?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    parent.canonicalize().ok().map(|p| p.join(file_name))
}
