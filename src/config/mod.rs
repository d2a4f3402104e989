//! Task file parsing and validation
//!
//! This module finds and reads trun.yml task files and validates them into a
//! [`Registry`](crate::runner::Registry).

pub mod parse;
pub mod schema;
pub mod types;

// Re-export main types
pub use parse::*;
pub use schema::*;
pub use types::*;
