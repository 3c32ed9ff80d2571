//! # Connector Layer
//!
//! External integrations implementing application interfaces:
//! - Document decoding (lopdf for PDF, mock for tests and offline runs)
//! - Completion service (Anthropic Messages API, mock for tests)

pub mod adapter;

pub use adapter::*;
