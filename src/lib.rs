pub mod archive;
pub mod commands;
pub mod config;
pub mod core;
pub mod progress;
pub mod result;
pub mod utils;
