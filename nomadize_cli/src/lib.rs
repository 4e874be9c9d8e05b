//! Nomadize CLI library
//!
//! Command orchestration, configuration and terminal handling for the
//! `nomadize` binary.

pub mod config;
pub mod error;
pub mod orchestrators;
pub mod paths;
pub mod platform;
pub mod progress;
pub mod prompt;
pub mod terminal;
