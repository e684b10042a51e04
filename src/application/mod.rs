//! Application services layer scaffolding.

pub mod error;
pub mod fanout;
pub mod pagination;
pub mod publish;
pub mod repos;
pub mod social;
pub mod timeline;
