//! Feature modules

pub mod explosion;
