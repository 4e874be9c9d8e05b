//! Directory-service error types
//!
//! Query failures carry the protocol stage that failed. Each stage maps to a
//! stable negative sentinel code so callers can tell "could not determine"
//! apart from "zero matches".

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Status code returned by a directory-service call (`0` is success)
pub type DirStatus = i32;

/// Protocol stage of a directory-service query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStage {
    /// Opening the daemon session
    Session,
    /// Enumerating the search node for a scope
    NodeDiscovery,
    /// Reading the search node's name from the enumeration buffer
    NodeName,
    /// Opening the search node
    NodeOpen,
    /// Running the record lookup
    RecordList,
}

impl QueryStage {
    /// Negative sentinel code for this stage
    pub const fn code(self) -> i32 {
        match self {
            Self::Session => -1,
            Self::NodeDiscovery => -2,
            Self::NodeName => -3,
            Self::NodeOpen => -4,
            Self::RecordList => -5,
        }
    }

    /// Human readable stage name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::NodeDiscovery => "node discovery",
            Self::NodeName => "node name",
            Self::NodeOpen => "node open",
            Self::RecordList => "record list",
        }
    }
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What went wrong inside a failing stage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageFailure {
    /// The daemon call returned a non-zero status
    #[error("daemon returned status {0}")]
    Status(DirStatus),

    /// The daemon refused to allocate a buffer
    #[error("daemon could not allocate a {0}-byte buffer")]
    BufferAllocation(u32),

    /// The daemon refused to build a term list
    #[error("daemon could not build a term list for '{0}'")]
    ListAllocation(String),

    /// Node enumeration did not find exactly one node
    #[error("expected exactly one search node, found {0}")]
    NodeCount(u32),

    /// A record returned by the daemon could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A directory-service query failed at a specific stage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Directory query failed at {stage} stage: {failure}")]
pub struct QueryError {
    /// Stage that failed
    pub stage: QueryStage,
    /// Underlying failure
    #[source]
    pub failure: StageFailure,
}

impl QueryError {
    /// Create a query error
    pub fn new(stage: QueryStage, failure: StageFailure) -> Self {
        Self { stage, failure }
    }

    /// Create a query error from a daemon status
    pub fn status(stage: QueryStage, status: DirStatus) -> Self {
        Self::new(stage, StageFailure::Status(status))
    }

    /// Negative sentinel code of the failing stage
    pub fn code(&self) -> i32 {
        self.stage.code()
    }

    /// Raw daemon status, when the failure came from a daemon call
    pub fn daemon_status(&self) -> Option<DirStatus> {
        match self.failure {
            StageFailure::Status(status) => Some(status),
            _ => None,
        }
    }
}

/// Errors decoding variable-length daemon records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than a record header
    #[error("Record header truncated: need {needed} bytes, have {available}")]
    TruncatedHeader { needed: usize, available: usize },

    /// Declared payload length runs past the available bytes
    #[error("Declared length {declared} overruns the {available} bytes available")]
    LengthOverrun { declared: u32, available: usize },

    /// Declared payload length exceeds the record's declared capacity
    #[error("Declared length {length} exceeds declared capacity {capacity}")]
    LengthExceedsCapacity { length: u32, capacity: u32 },

    /// Writing a record would exceed the buffer capacity
    #[error("Buffer full: record needs {needed} bytes, {remaining} remaining")]
    BufferFull { needed: usize, remaining: usize },

    /// Payload was expected to be text
    #[error("Record payload is not valid UTF-8")]
    InvalidUtf8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_codes_are_distinct_and_negative() {
        let codes: Vec<i32> = [
            QueryStage::Session,
            QueryStage::NodeDiscovery,
            QueryStage::NodeName,
            QueryStage::NodeOpen,
            QueryStage::RecordList,
        ]
        .iter()
        .map(|s| s.code())
        .collect();
        assert_eq!(codes, vec![-1, -2, -3, -4, -5]);
    }

    #[test]
    fn test_query_error_message() {
        let error = QueryError::new(QueryStage::NodeDiscovery, StageFailure::NodeCount(0));
        assert_eq!(
            error.to_string(),
            "Directory query failed at node discovery stage: expected exactly one search node, found 0"
        );
        assert_eq!(error.daemon_status(), None);
    }

    #[test]
    fn test_query_error_keeps_daemon_status() {
        let error = QueryError::status(QueryStage::Session, -14000);
        assert_eq!(error.code(), -1);
        assert_eq!(error.daemon_status(), Some(-14000));
    }
}
