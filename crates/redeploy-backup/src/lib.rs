//! backup services and utilities

pub mod services;

pub use services::*;
