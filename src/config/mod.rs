//! Configuration module for Play-Sweeper
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional and falls back to its defaults.
//!
//! # Example
//!
//! ```no_run
//! use play_sweeper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sweeper.toml")).unwrap();
//! println!("Control API on {}:{}", config.server.host, config.server.port);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, FetchConfig, OutputConfig, PoolConfig, ServerConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
