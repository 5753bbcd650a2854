//! CLI subcommands

pub mod catalog;
pub mod extract;
pub mod run;
pub mod validate;
