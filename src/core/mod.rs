//! Core value types and constants for PM sensor acquisition

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
