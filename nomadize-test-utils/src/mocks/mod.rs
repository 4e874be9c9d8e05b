//! Mock implementations for testing

mod directory;
mod tools;

pub use directory::{
    BUFFER_TOO_SMALL_STATUS, INVALID_REFERENCE_STATUS, InjectedFailure, MOCK_FAILURE_STATUS,
    MockCall, MockDirectoryService, Outstanding,
};
pub use tools::{MockAccountTools, PROVISIONED_MARKER, ToolCall};
