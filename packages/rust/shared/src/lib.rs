//! Shared error type, configuration, wire types, and filename handling
//! for the wikimirror workspace.

pub mod config;
pub mod error;
pub mod filename;
pub mod types;

pub use config::{
    AppConfig, ExportConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, resolve_api_token,
};
pub use error::{MirrorError, Result};
pub use filename::sanitize_filename;
pub use types::{Attachment, Page, PageBody, PageVersion, Space, StorageBody};
