//! Side-effecting adapters: filesystem, git, subprocesses, LLM provider.

pub mod code_agent;
pub mod config;
pub mod files;
pub mod git;
pub mod llm;
pub mod process;
pub mod prompt;
pub mod template;
