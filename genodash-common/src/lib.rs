//! Shared types for the GenoDash client core
//!
//! Data model, role/permission evaluation, static navigation data,
//! error taxonomy, and configuration resolution. No network code lives
//! here; `genodash-client` consumes these types.

pub mod access;
pub mod config;
pub mod error;
pub mod models;
pub mod navigation;

pub use crate::error::{Error, Result};
