//! Directory-service query protocol
//!
//! This module answers "does an account named X exist within scope S?" by
//! speaking the directory daemon's session/query protocol:
//! - `service`: the daemon ABI as a trait (`DirectoryService`)
//! - `guard`: scoped session, buffer, term list and node handles
//! - `record`: decoding of variable-length daemon records
//! - `client`: the query sequence itself (`DirectoryQueryClient`)
//! - `native`: the macOS DirectoryService framework binding

pub mod client;
pub mod guard;
#[cfg(target_os = "macos")]
pub mod native;
pub mod record;
pub mod service;

use crate::error::{QueryError, QueryStage, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export main types
pub use client::DirectoryQueryClient;
pub use record::{DATA_NODE_HEADER_SIZE, DataNode, DirectoryBuffer};
pub use service::{DirectoryService, RecordPage, RecordQuery};

/// Match records whose attribute equals the value exactly (`eDSiExact`)
pub const EXACT_MATCH: u32 = 0x2101;

/// Record type of standard user accounts
pub const USER_RECORD_TYPE: &str = "dsRecTypeStandard:Users";

/// Attribute retrieved for matched user records
pub const NATIVE_NAME_ATTRIBUTE: &str = "dsAttrTypeNative:name";

/// Default capacity of the node enumeration buffer
pub const DEFAULT_NODE_BUFFER_SIZE: u32 = 2 * 1024;

/// Default capacity of the record lookup buffer
pub const DEFAULT_RECORD_BUFFER_SIZE: u32 = 8 * 1024;

/// Smallest buffer capacity accepted by configuration
pub const MIN_BUFFER_SIZE: u32 = 512;

/// Which directory node(s) a query searches
///
/// The discriminants are the daemon's node-type constants and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum SearchScope {
    /// Local node only (`eDSLocalNodeNames`)
    #[serde(rename = "local")]
    LocalOnly = 0x2200,
    /// Network (contacts) search node only (`eDSContactsSearchNodeName`)
    #[default]
    #[serde(rename = "network")]
    NetworkOnly = 0x2204,
    /// Authentication search node, local and network (`eDSAuthenticationSearchNodeName`)
    #[serde(rename = "combined")]
    CombinedLocalAndNetwork = 0x2201,
}

impl SearchScope {
    /// Protocol constant passed to node enumeration
    pub const fn protocol_value(self) -> u32 {
        self as u32
    }

    /// Configuration / CLI name
    pub const fn name(self) -> &'static str {
        match self {
            Self::LocalOnly => "local",
            Self::NetworkOnly => "network",
            Self::CombinedLocalAndNetwork => "combined",
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SearchScope {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::LocalOnly),
            "network" => Ok(Self::NetworkOnly),
            "combined" => Ok(Self::CombinedLocalAndNetwork),
            other => Err(ValidationError::invalid_parameter(
                "scope",
                &format!("'{other}' is not one of local, network, combined"),
            )),
        }
    }
}

/// Query configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    pub scope: SearchScope,
    pub node_buffer_size: u32,
    pub record_buffer_size: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            scope: SearchScope::default(),
            node_buffer_size: DEFAULT_NODE_BUFFER_SIZE,
            record_buffer_size: DEFAULT_RECORD_BUFFER_SIZE,
        }
    }
}

impl QueryConfig {
    /// Check buffer sizes
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.node_buffer_size < MIN_BUFFER_SIZE {
            return Err(ValidationError::invalid_configuration(&format!(
                "node_buffer_size must be at least {MIN_BUFFER_SIZE} bytes"
            )));
        }
        if self.record_buffer_size < self.node_buffer_size {
            return Err(ValidationError::invalid_configuration(
                "record_buffer_size must be at least node_buffer_size",
            ));
        }
        Ok(())
    }
}

/// Classification of a query result for callers deciding what to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Every stage succeeded and nothing matched
    Absent,
    /// Every stage succeeded and `n >= 1` records matched
    Present(u32),
    /// A stage failed; existence is unknown
    Indeterminate(QueryStage),
}

impl QueryOutcome {
    /// Integer form: the match count, or the failing stage's negative code
    pub fn code(self) -> i64 {
        match self {
            Self::Absent => 0,
            Self::Present(count) => i64::from(count),
            Self::Indeterminate(stage) => i64::from(stage.code()),
        }
    }

    /// Whether the account definitely exists
    pub fn exists(self) -> bool {
        matches!(self, Self::Present(_))
    }
}

impl From<&Result<u32, QueryError>> for QueryOutcome {
    fn from(result: &Result<u32, QueryError>) -> Self {
        match result {
            Ok(0) => Self::Absent,
            Ok(count) => Self::Present(*count),
            Err(err) => Self::Indeterminate(err.stage),
        }
    }
}
