//! Test utilities for Nomadize
//!
//! This crate provides a mock directory daemon, mock account tools and
//! on-disk fixtures for testing the query client and the migration.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{TestAccountsRoot, TestHomeBuilder, snapshot};
pub use mocks::{
    InjectedFailure, MockAccountTools, MockCall, MockDirectoryService, Outstanding, ToolCall,
};
