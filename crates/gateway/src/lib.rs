#![deny(unused)]
//! Request-orchestration gateway for Exgate.
//!
//! This crate provides the HTTP entry point for the system and the
//! orchestration core behind it: the TTL result cache, the batch
//! orchestrator with its admission gate, and the response assembler.

pub mod assembler;
pub mod cache;
pub mod orchestrator;
pub mod server;

pub use assembler::{ErrorBody, ExtractionResponse, RequestEcho};
pub use cache::ResultCache;
pub use orchestrator::BatchOrchestrator;
pub use server::{GatewayConfig, GatewayServer};
