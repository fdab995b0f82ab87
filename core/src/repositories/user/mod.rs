//! User lookup.

mod r#trait;
pub use r#trait::UserStore;

mod memory;
pub use memory::InMemoryUserStore;
