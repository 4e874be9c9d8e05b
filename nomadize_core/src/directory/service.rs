//! Directory daemon ABI
//!
//! [`DirectoryService`] is the boundary to the directory-service daemon. Each
//! method corresponds to one daemon call; handles are opaque associated types
//! owned by the implementation. Callers are expected to go through the guards
//! in [`super::guard`] so that every handle is released exactly once.

use super::SearchScope;
use super::record::DataNode;
use crate::error::{DirStatus, StageFailure};
use std::fmt::Debug;

/// Status returned by a successful daemon call
pub const STATUS_OK: DirStatus = 0;

/// Terms of a record lookup
#[derive(Debug, Clone, Copy)]
pub struct RecordQuery<L> {
    /// Record names to match
    pub names: L,
    /// Pattern match type (e.g. [`super::EXACT_MATCH`])
    pub match_type: u32,
    /// Record types to search
    pub record_types: L,
    /// Attributes to return
    pub attributes: L,
    /// Return attribute descriptions only, not values
    pub attribute_info_only: bool,
}

/// One page of record lookup results
#[derive(Debug)]
pub struct RecordPage<C> {
    /// Records in this page
    pub count: u32,
    /// Continuation data, present when more pages exist
    pub continuation: Option<C>,
}

/// Directory-service daemon operations
pub trait DirectoryService {
    /// Open session reference
    type Session: Copy + Debug;
    /// Open node reference
    type Node: Copy + Debug;
    /// Daemon-allocated data buffer
    type Buffer: Copy + Debug;
    /// Daemon-side parsed string list
    type List: Copy + Debug;
    /// Continuation data for paged results
    type Continuation: Debug;

    /// Open a session with the daemon
    fn open_session(&self) -> Result<Self::Session, DirStatus>;

    /// Close a session
    fn close_session(&self, session: Self::Session) -> DirStatus;

    /// Allocate a buffer of fixed capacity bound to a session
    fn allocate_buffer(&self, session: Self::Session, capacity: u32) -> Option<Self::Buffer>;

    /// Release a buffer
    fn deallocate_buffer(&self, session: Self::Session, buffer: Self::Buffer) -> DirStatus;

    /// Enumerate nodes for a scope into `buffer`, returning how many matched
    fn find_nodes(
        &self,
        session: Self::Session,
        buffer: Self::Buffer,
        scope: SearchScope,
    ) -> Result<u32, DirStatus>;

    /// Read the name of the enumerated node at a 1-based index
    fn node_name(
        &self,
        session: Self::Session,
        buffer: Self::Buffer,
        index: u32,
    ) -> Result<Self::List, DirStatus>;

    /// Build a single-entry string list
    fn build_list(&self, session: Self::Session, value: &str) -> Option<Self::List>;

    /// Decode the entries of a list; a failing daemon call keeps its status
    fn list_entries(
        &self,
        session: Self::Session,
        list: Self::List,
    ) -> Result<Vec<DataNode>, StageFailure>;

    /// Release a list
    fn deallocate_list(&self, session: Self::Session, list: Self::List) -> DirStatus;

    /// Open the node named by `path`
    fn open_node(&self, session: Self::Session, path: Self::List) -> Result<Self::Node, DirStatus>;

    /// Close a node
    fn close_node(&self, node: Self::Node) -> DirStatus;

    /// Look up records on an open node
    fn record_list(
        &self,
        node: Self::Node,
        buffer: Self::Buffer,
        query: &RecordQuery<Self::List>,
    ) -> Result<RecordPage<Self::Continuation>, DirStatus>;

    /// Release continuation data returned by a lookup
    fn release_continuation(&self, node: Self::Node, continuation: Self::Continuation)
    -> DirStatus;
}
