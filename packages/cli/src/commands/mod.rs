pub mod merge;
pub mod stream;
pub mod validate;

pub use merge::{merge, MergeArgs};
pub use stream::{stream, StreamArgs};
pub use validate::{validate, ValidateArgs};

use anyhow::Context;
use screenkit_model::ScreenDocument;
use std::path::Path;

/// Read and parse a screen document from a JSON file
pub fn read_document(path: &Path) -> anyhow::Result<ScreenDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid screen document {}", path.display()))
}
