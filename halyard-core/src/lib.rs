//! Halyard Core
//!
//! Core library for a declarative infrastructure management tool: the
//! resource model, attribute schemas, and the provider contract.

pub mod provider;
pub mod resource;
pub mod schema;
