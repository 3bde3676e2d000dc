//! Explosion of materials feature
//!
//! Generates derived CSV artifacts from the relational source and tracks
//! per-artifact-type progress in the durable status document.

pub mod builder;
pub mod catalog;
pub mod commands;
pub mod queries;
pub mod routes;
pub mod store;

pub use routes::explosion_routes;
