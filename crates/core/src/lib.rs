#![deny(unused)]
//! Core types, traits, and error definitions for Exgate.
//!
//! This crate provides the foundational building blocks shared across the
//! extraction gateway: the error taxonomy, layered configuration, the
//! domain data model, and the upstream engine trait.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::*;
pub use types::*;
