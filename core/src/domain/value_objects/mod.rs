//! Value objects representing immutable domain concepts.

pub mod issued_tokens;

pub use issued_tokens::IssuedTokens;
