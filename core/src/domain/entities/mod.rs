//! Domain entities representing core business objects.

pub mod client;
pub mod security_event;
pub mod token;
pub mod user;

// Re-export commonly used types
pub use client::Client;
pub use security_event::{SecurityEvent, SecurityEventKind};
pub use token::{AccessClaims, AccessToken, RefreshPayload, RefreshToken};
pub use user::User;
