//! Authentication service module
//!
//! Ties user and client lookup to token issuance:
//! - sign-in issues a fresh pair
//! - refresh rotates a pair
//! - sign-out revokes a pair

mod service;


pub use service::AuthService;
