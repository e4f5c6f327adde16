//! Shared types for the binstr crates.
pub mod errors;
