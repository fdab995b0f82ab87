//! Access/refresh token persistence.

mod r#trait;
pub use r#trait::{PresentedPair, RotationCommit, RotationOutcome, TokenStore};

mod memory;
pub use memory::InMemoryTokenStore;
