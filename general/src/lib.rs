pub mod campaign;
pub mod config;
pub mod manifest;
