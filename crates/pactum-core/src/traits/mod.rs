//! Core traits for pactum collaborators.

mod dispatcher;
mod embedder;
mod recognizer;
mod store;
mod strategy;

pub use dispatcher::*;
pub use embedder::*;
pub use recognizer::*;
pub use store::*;
pub use strategy::*;
