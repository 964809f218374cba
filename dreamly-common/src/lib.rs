//! # Dreamly Common Library
//!
//! Shared code for Dreamly services:
//! - Error types
//! - Bootstrap configuration loading and root folder resolution
//! - Tracing initialization

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
