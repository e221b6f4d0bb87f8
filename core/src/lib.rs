// Core types shared by the shelf crates:
// - Session identity minting and validation
// - Catalog record types
// - Configuration loading
// - Shared error types

pub mod identity;
pub use identity::*;

pub mod types;
pub use types::*;

pub mod config;
pub use config::*;

pub mod errors;
pub use errors::*;
