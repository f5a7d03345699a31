#![deny(unused)]
//! Upstream provider adapters for Exgate.
//!
//! This crate provides:
//! - The Tavily extraction client with timeout, retry, and backoff policy
//! - Point-in-time health probing of the provider
//! - A mock engine for orchestrator and server tests

pub mod mock;
pub mod tavily;

pub use mock::MockEngine;
pub use tavily::{TavilyConfig, TavilyEngine};
