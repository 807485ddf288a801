//! Configuration module for RIA Cars
//!
//! This module handles loading, parsing, and validating the TOML
//! configuration file and the `RIA_*` environment overrides layered on top.
//!
//! # Example
//!
//! ```no_run
//! use ria_cars::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ria-cars.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.max_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, ScheduleConfig, ServerConfig, SiteConfig, StorageConfig,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, resolve_config,
};
