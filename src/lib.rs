pub mod catalog;
pub mod config;
pub mod manifest;
pub mod parser;
pub mod patch;
pub mod upgrade;
pub mod version;
