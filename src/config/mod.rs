//! Configuration module for Seedcrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The `[[item]]` records are host inputs and are validated per item later, not here.
//!
//! # Example
//!
//! ```no_run
//! use seedcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("seedcrawl.toml")).unwrap();
//! println!("Request timeout: {}s", config.engine.request_timeout_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, EngineConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
