//! Shared types, error model, and configuration for lakeport.
//!
//! This crate is the foundation depended on by all other lakeport crates.
//! It provides:
//! - [`LakeportError`] — the unified error type
//! - Outline domain types ([`OutlineEntry`], [`Node`], [`GroupNode`], [`DocNode`])
//! - Configuration ([`AppConfig`], [`ConvertOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ConvertOptions, DefaultsConfig, ImagesConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{LakeportError, Result};
pub use types::{DocNode, GroupNode, Node, OutlineEntry, OutlineKind, RawTocItem, UNTITLED};
