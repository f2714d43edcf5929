pub mod build_config;
pub mod loader;
pub mod schema;

pub use build_config::BuildConfig;
pub use loader::{DataLoadError, build_tree, load_build_config, load_document};
pub use schema::{BuildConfigData, DocumentData};
