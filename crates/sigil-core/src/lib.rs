//! Sigil Core: Fundamental types and errors shared by every Sigil crate.

pub mod error;
pub mod types;

pub use error::CoreError;
pub use types::{Did, Network};
