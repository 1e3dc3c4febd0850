//! Small helpers shared by every crate in the workspace.

pub mod config;
pub mod env;
