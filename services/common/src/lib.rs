//! Shared data model, configuration and errors for the rates gateway

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

pub use config::*;
pub use constants::*;
pub use errors::*;
pub use types::*;
