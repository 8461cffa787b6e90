//! CLI command implementations

pub mod utils;

pub mod completions;
pub mod init;
pub mod migrate;
pub mod recipe;
pub mod reset;
