pub mod backlog;
pub mod config;
pub mod folder_name;
pub mod processor;
