pub mod audit;
pub mod client;
pub mod token;
pub mod user;

pub use audit::{
    InMemorySecurityEventSink, NoOpSecurityEventSink, SecurityEventSink, TracingSecurityEventSink,
};
pub use client::{ClientResolver, InMemoryClientRegistry};
pub use token::{
    InMemoryTokenStore, PresentedPair, RotationCommit, RotationOutcome, TokenStore,
};
pub use user::{InMemoryUserStore, UserStore};
