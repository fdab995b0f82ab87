//! OAuth client lookup.

mod r#trait;
pub use r#trait::ClientResolver;

mod memory;
pub use memory::InMemoryClientRegistry;
