//! BOMX Common Library
//!
//! Shared types, error handling, and logging for the BOMX workspace.
//!
//! # Overview
//!
//! This crate provides functionality used across all BOMX workspace members:
//!
//! - **Status model**: the durable per-artifact-type generation status
//!   document and its normalization rules
//! - **Error handling**: common error and result types
//! - **Logging**: tracing subscriber initialization
//!
//! # Example
//!
//! ```no_run
//! use bomx_common::status::StatusDocument;
//!
//! let doc = StatusDocument::fresh("B1", "v3");
//! assert!(doc.files.iter().all(|f| f.status.is_pending()));
//! ```

pub mod error;
pub mod logging;
pub mod status;

// Re-export commonly used types
pub use error::{BomxError, Result};
