//! Adapters for configuration files, editors and git.

pub mod config;
pub mod editor;
pub mod git;
