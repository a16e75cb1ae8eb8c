//! Subcommand implementations

pub mod clean;
pub mod hash;
pub mod install;
pub mod verify;
