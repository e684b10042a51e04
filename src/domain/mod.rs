//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod posts;
pub mod types;

pub use error::DomainError;
