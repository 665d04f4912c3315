//! YAML Loader module
//!
//! Parse reader configurations from YAML files.
//!
//! # Overview
//!
//! The loader module provides:
//! - `load_config` / `load_config_from_str` - YAML parsing with validation
//! - `render_config` - template interpolation of credentials and custom queries
//! - `build_auth_config` - runtime auth settings from their YAML form

mod parser;

pub use parser::{build_auth_config, load_config, load_config_from_str, render_config, template_context};
