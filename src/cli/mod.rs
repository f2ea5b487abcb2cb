//! CLI command handlers

pub mod commands;

pub use commands::{create_worksheet, search, sheets, write, Connection};
