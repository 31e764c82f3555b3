//! CLI command implementations

pub mod add;
pub mod categories;
pub mod debug;
pub mod health;
pub mod nearby;
pub mod seed;
