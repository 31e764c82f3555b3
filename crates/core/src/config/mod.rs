//! Configuration loading and schema definitions
//!
//! TOML file first, environment variables on top.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
