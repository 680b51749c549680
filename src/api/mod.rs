//! Interfaces exposing the compiler outside the library

pub mod cli;

// Re-exports
pub use cli::*;
