//! API Module - Command surface for the CLI

pub mod commands;
