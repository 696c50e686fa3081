//! Core types for pactum.

mod field;
mod job;
mod record;

pub use field::*;
pub use job::*;
pub use record::*;
