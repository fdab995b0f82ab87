//! Shared configuration for the SSO token services
//!
//! Every crate in the workspace reads its settings through the types here;
//! they load from the process environment and an optional `.env` file.

pub mod config;

pub use config::{
    AppConfig, DatabaseConfig, Environment, LogFormat, LoggingConfig, TableNames, TokenConfig,
};
