//! # SSO Core
//!
//! Domain layer for the single sign-on token services: entities, store
//! traits, error types, and the services that issue and rotate
//! access/refresh token pairs.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
