//! Core utilities and types shared across all redeploy crates

pub mod config;
pub mod error;
pub mod logger;
pub mod operator;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use error::*;
pub use logger::*;
pub use operator::*;
pub use types::*;
pub use utils::*;

// Re-export external dependencies
pub use anyhow;
pub use async_trait;
pub use chrono;
pub use thiserror;
pub use tokio;
pub use tracing;
