//! # Sockdrawer Common Library
//!
//! Shared code for the Sockdrawer services:
//! - Configuration loading and validation
//! - JSON-RPC 2.0 envelope types and correlation IDs
//! - Common error type

pub mod config;
pub mod error;
pub mod jsonrpc;

pub use config::BridgeConfig;
pub use error::{Error, Result};
