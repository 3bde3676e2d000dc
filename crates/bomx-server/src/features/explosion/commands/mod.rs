//! Explosion commands

pub mod generate;
