//! Explosion queries

pub mod status;
