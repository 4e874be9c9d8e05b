//! Command orchestrators for business logic
//!
//! This module provides orchestrators that coordinate between the CLI layer
//! and the core library services.

pub mod lookup_orchestrator;
pub mod migrate_orchestrator;
