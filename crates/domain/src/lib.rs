//! Domain layer for Rendezvous
//!
//! Contains the value objects, entities and pure geometry used to resolve a
//! transit-balanced meeting point between two parties. This layer performs no
//! I/O and defines the ubiquitous language shared by the other crates.

pub mod entities;
pub mod errors;
pub mod geometry;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
