//! Shared types, error model, and configuration for Copydesk.
//!
//! This crate is the foundation depended on by all other Copydesk crates.
//! It provides:
//! - [`CopydeskError`] — the unified error type
//! - Domain types ([`CompanyRecord`], [`CompanyDirectory`], [`GeneratedContent`], [`OutputRow`])
//! - Configuration ([`AppConfig`], config loading, API key resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, OpenAiConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, resolve_api_key,
};
pub use error::{CopydeskError, Result};
pub use types::{
    CompanyDirectory, CompanyRecord, GeneratedContent, OUTPUT_HEADERS, OutputRow,
    PARSE_ERROR_MARKER, fields,
};
