//! Domain layer for the validation gateway
//!
//! Contains the validation policy model, validation outcomes, response rules
//! and the user profile projection. This layer performs no I/O.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
