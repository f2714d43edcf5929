//! Loading pipeline: reads data files, replays documents through the
//! lifecycle protocol, and resolves build configurations.
//!
//! Provides format detection (RON/JSON/TOML) and deserialization helpers
//! used by the higher-level loaders.

use crate::build_config::BuildConfig;
use crate::schema::{BuildConfigData, DocumentData};
use gravel_core::id::NodeId;
use gravel_core::tree::{DocumentError, ResourceTree};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The file parsed but does not describe a valid document.
    #[error("invalid document {file}: {source}")]
    Document {
        file: PathBuf,
        #[source]
        source: DocumentError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    let parse_error = |detail: String| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
    }
}

// ===========================================================================
// Documents
// ===========================================================================

/// Replay `data` into `tree` as the document root, ending (and sealing)
/// the tree once the whole description has been applied.
pub fn build_into(tree: &mut ResourceTree, data: &DocumentData) -> Result<NodeId, DocumentError> {
    replay(tree, data, None)
}

/// Build a fresh tree with default settings from `data`.
pub fn build_tree(data: &DocumentData) -> Result<ResourceTree, DocumentError> {
    let mut tree = ResourceTree::new();
    build_into(&mut tree, data)?;
    Ok(tree)
}

fn replay(
    tree: &mut ResourceTree,
    data: &DocumentData,
    parent: Option<NodeId>,
) -> Result<NodeId, DocumentError> {
    let node = tree.start_node(data.kind, parent)?;
    for (name, value) in &data.attrs {
        tree.handle_attribute(node, name, value)?;
    }
    for child in &data.children {
        replay(tree, child, Some(node))?;
    }
    tree.end_node(node)?;
    Ok(node)
}

/// Load a document file into a default tree and resolve its base directory
/// against the directory containing the file.
pub fn load_document(path: &Path) -> Result<ResourceTree, DataLoadError> {
    load_document_into(ResourceTree::new(), path)
}

/// Like [`load_document`], but into a caller-configured (empty) tree, for
/// example one with a custom system-identifier predicate.
#[instrument(level = "debug", skip(tree))]
pub fn load_document_into(
    mut tree: ResourceTree,
    path: &Path,
) -> Result<ResourceTree, DataLoadError> {
    let data: DocumentData = deserialize_file(path)?;
    let document_error = |source: DocumentError| DataLoadError::Document {
        file: path.to_path_buf(),
        source,
    };
    build_into(&mut tree, &data).map_err(document_error)?;

    let own_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    tree.set_own_dir(own_dir).map_err(document_error)?;
    debug!(nodes = tree.len(), base_dir = %tree.base_dir().display(), "document loaded");
    Ok(tree)
}

// ===========================================================================
// Build configuration
// ===========================================================================

/// Load and resolve a build configuration file.
pub fn load_build_config(path: &Path) -> Result<BuildConfig, DataLoadError> {
    let data: BuildConfigData = deserialize_file(path)?;
    Ok(BuildConfig::from(data))
}

// ===========================================================================
// Tests
// ===========================================================================
