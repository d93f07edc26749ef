//! deployments services and utilities

pub mod services;
pub mod test_utils;

pub use services::*;
