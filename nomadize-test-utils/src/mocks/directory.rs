//! Mock directory-service daemon for testing

use bytes::Bytes;
use nomadize_core::directory::{
    DataNode, DirectoryBuffer, DirectoryService, EXACT_MATCH, RecordPage, RecordQuery,
    SearchScope, USER_RECORD_TYPE,
};
use nomadize_core::error::{DecodeError, DirStatus, StageFailure};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Status returned by injected failures unless a test picks another
pub const MOCK_FAILURE_STATUS: DirStatus = -14000;

/// Status returned when a handle is unknown or already released
pub const INVALID_REFERENCE_STATUS: DirStatus = -14030;

/// Status returned when enumerated node names do not fit the buffer
pub const BUFFER_TOO_SMALL_STATUS: DirStatus = -14128;

/// A failure the mock can be told to produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Opening the session fails
    Session(DirStatus),
    /// Node enumeration fails with a status
    NodeDiscovery(DirStatus),
    /// Node enumeration succeeds but reports this many nodes
    NodeCount(u32),
    /// Reading the node name fails
    NodeName(DirStatus),
    /// The node name contains bytes that are not UTF-8
    MalformedNodeName,
    /// Reading an entry out of a list fails
    ListEntry(DirStatus),
    /// Opening the node fails
    NodeOpen(DirStatus),
    /// The record lookup fails
    RecordList(DirStatus),
    /// Allocating a buffer of this capacity returns nothing
    BufferAllocation(u32),
    /// Building a list holding this value returns nothing
    ListAllocation(String),
}

/// One call made against the mock, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    OpenSession,
    CloseSession,
    AllocateBuffer(u32),
    DeallocateBuffer(u32),
    FindNodes(SearchScope),
    NodeName(u32),
    BuildList(String),
    DeallocateList,
    OpenNode(String),
    CloseNode,
    RecordList,
    ReleaseContinuation,
}

/// Handles still held by callers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outstanding {
    pub sessions: usize,
    pub buffers: usize,
    pub lists: usize,
    pub nodes: usize,
    pub continuations: usize,
}

impl Outstanding {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug)]
struct MockState {
    next_handle: u32,
    sessions: HashSet<u32>,
    buffers: HashMap<u32, DirectoryBuffer>,
    lists: HashMap<u32, Vec<DataNode>>,
    nodes: HashMap<u32, SearchScope>,
    continuations: HashSet<u32>,
    invalid_releases: usize,
    calls: Vec<MockCall>,
    users: HashMap<SearchScope, Vec<String>>,
    node_paths: HashMap<SearchScope, Vec<&'static str>>,
    failures: Vec<InjectedFailure>,
    paged_results: bool,
}

impl Default for MockState {
    fn default() -> Self {
        let mut node_paths = HashMap::new();
        node_paths.insert(SearchScope::LocalOnly, vec!["Local", "Default"]);
        node_paths.insert(SearchScope::NetworkOnly, vec!["Search", "Contacts"]);
        node_paths.insert(SearchScope::CombinedLocalAndNetwork, vec!["Search"]);

        Self {
            next_handle: 1,
            sessions: HashSet::new(),
            buffers: HashMap::new(),
            lists: HashMap::new(),
            nodes: HashMap::new(),
            continuations: HashSet::new(),
            invalid_releases: 0,
            calls: Vec::new(),
            users: HashMap::new(),
            node_paths,
            failures: Vec::new(),
            paged_results: false,
        }
    }
}

impl MockState {
    fn handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn injected<T>(&self, pick: impl Fn(&InjectedFailure) -> Option<T>) -> Option<T> {
        self.failures.iter().find_map(pick)
    }

    fn release_status(&mut self, released: bool) -> DirStatus {
        if released {
            0
        } else {
            self.invalid_releases += 1;
            INVALID_REFERENCE_STATUS
        }
    }

    fn scope_for_path(&self, rendered: &str) -> Option<SearchScope> {
        self.node_paths
            .iter()
            .find(|(_, segments)| {
                let path: String = segments.iter().map(|s| format!("/{s}")).collect();
                path == rendered
            })
            .map(|(scope, _)| *scope)
    }
}

/// In-memory directory daemon with leak accounting
///
/// Clones share state, so a test can hand one clone to a
/// [`nomadize_core::DirectoryQueryClient`] and inspect another afterwards.
///
/// # Examples
///
/// ```rust
/// use nomadize_core::{DirectoryQueryClient, SearchScope};
/// use nomadize_test_utils::MockDirectoryService;
///
/// let mock = MockDirectoryService::new().with_user(SearchScope::NetworkOnly, "alice");
/// let client = DirectoryQueryClient::new(mock.clone());
///
/// assert_eq!(client.resolve_user_exists("alice", SearchScope::NetworkOnly).unwrap(), 1);
/// assert!(mock.outstanding().is_clean());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockDirectoryService {
    state: Arc<Mutex<MockState>>,
}

impl MockDirectoryService {
    /// Create a mock with no users and no failures
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user record visible in `scope`
    ///
    /// The combined scope also sees local and network users.
    pub fn with_user(self, scope: SearchScope, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .users
            .entry(scope)
            .or_default()
            .push(name.to_string());
        self
    }

    /// Make a call fail
    pub fn with_failure(self, failure: InjectedFailure) -> Self {
        self.inject(failure);
        self
    }

    /// Make a call fail from now on
    pub fn inject(&self, failure: InjectedFailure) {
        self.state.lock().unwrap().failures.push(failure);
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    /// Return continuation data with every record lookup
    pub fn with_paged_results(self) -> Self {
        self.state.lock().unwrap().paged_results = true;
        self
    }

    /// Handles acquired and not yet released
    pub fn outstanding(&self) -> Outstanding {
        let state = self.state.lock().unwrap();
        Outstanding {
            sessions: state.sessions.len(),
            buffers: state.buffers.len(),
            lists: state.lists.len(),
            nodes: state.nodes.len(),
            continuations: state.continuations.len(),
        }
    }

    /// Releases of unknown or already released handles
    pub fn invalid_releases(&self) -> usize {
        self.state.lock().unwrap().invalid_releases
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of calls matching `predicate`
    pub fn count_calls(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }
}

impl DirectoryService for MockDirectoryService {
    type Session = u32;
    type Node = u32;
    type Buffer = u32;
    type List = u32;
    type Continuation = u32;

    fn open_session(&self) -> Result<u32, DirStatus> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::OpenSession);
        if let Some(status) = state.injected(|f| match f {
            InjectedFailure::Session(status) => Some(*status),
            _ => None,
        }) {
            return Err(status);
        }
        let session = state.handle();
        state.sessions.insert(session);
        Ok(session)
    }

    fn close_session(&self, session: u32) -> DirStatus {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::CloseSession);
        let released = state.sessions.remove(&session);
        state.release_status(released)
    }

    fn allocate_buffer(&self, session: u32, capacity: u32) -> Option<u32> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::AllocateBuffer(capacity));
        let refused = state
            .injected(|f| match f {
                InjectedFailure::BufferAllocation(size) if *size == capacity => Some(()),
                _ => None,
            })
            .is_some();
        if refused || !state.sessions.contains(&session) {
            return None;
        }
        let buffer = state.handle();
        state
            .buffers
            .insert(buffer, DirectoryBuffer::with_capacity(capacity));
        Some(buffer)
    }

    fn deallocate_buffer(&self, _session: u32, buffer: u32) -> DirStatus {
        let mut state = self.state.lock().unwrap();
        let removed = state.buffers.remove(&buffer);
        let capacity = removed.as_ref().map_or(0, DirectoryBuffer::capacity);
        state.calls.push(MockCall::DeallocateBuffer(capacity));
        state.release_status(removed.is_some())
    }

    fn find_nodes(&self, _session: u32, buffer: u32, scope: SearchScope) -> Result<u32, DirStatus> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::FindNodes(scope));
        if let Some(status) = state.injected(|f| match f {
            InjectedFailure::NodeDiscovery(status) => Some(*status),
            _ => None,
        }) {
            return Err(status);
        }

        let segments = state.node_paths.get(&scope).cloned().unwrap_or_default();
        let target = state.buffers.get_mut(&buffer).ok_or(INVALID_REFERENCE_STATUS)?;
        target.clear();
        for segment in segments {
            target
                .push(&DataNode::from_text(segment))
                .map_err(|_| BUFFER_TOO_SMALL_STATUS)?;
        }

        let count = state
            .injected(|f| match f {
                InjectedFailure::NodeCount(count) => Some(*count),
                _ => None,
            })
            .unwrap_or(1);
        Ok(count)
    }

    fn node_name(&self, _session: u32, buffer: u32, index: u32) -> Result<u32, DirStatus> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::NodeName(index));
        if let Some(status) = state.injected(|f| match f {
            InjectedFailure::NodeName(status) => Some(*status),
            _ => None,
        }) {
            return Err(status);
        }

        let source = state.buffers.get(&buffer).ok_or(INVALID_REFERENCE_STATUS)?;
        let mut segments = source
            .records()
            .collect::<Result<Vec<_>, DecodeError>>()
            .map_err(|_| MOCK_FAILURE_STATUS)?;
        if state.failures.contains(&InjectedFailure::MalformedNodeName) {
            segments.push(DataNode::new(Bytes::from_static(&[0xff, 0xfe])));
        }

        let list = state.handle();
        state.lists.insert(list, segments);
        Ok(list)
    }

    fn build_list(&self, _session: u32, value: &str) -> Option<u32> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::BuildList(value.to_string()));
        if state.failures.contains(&InjectedFailure::ListAllocation(value.to_string())) {
            return None;
        }
        let list = state.handle();
        state.lists.insert(list, vec![DataNode::from_text(value)]);
        Some(list)
    }

    fn list_entries(&self, _session: u32, list: u32) -> Result<Vec<DataNode>, StageFailure> {
        let state = self.state.lock().unwrap();
        if let Some(status) = state.injected(|f| match f {
            InjectedFailure::ListEntry(status) => Some(*status),
            _ => None,
        }) {
            return Err(StageFailure::Status(status));
        }
        state
            .lists
            .get(&list)
            .cloned()
            .ok_or(StageFailure::Status(INVALID_REFERENCE_STATUS))
    }

    fn deallocate_list(&self, _session: u32, list: u32) -> DirStatus {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::DeallocateList);
        let released = state.lists.remove(&list).is_some();
        state.release_status(released)
    }

    fn open_node(&self, _session: u32, path: u32) -> Result<u32, DirStatus> {
        let mut state = self.state.lock().unwrap();
        let rendered = state
            .lists
            .get(&path)
            .map(|segments| {
                segments
                    .iter()
                    .map(|s| format!("/{}", String::from_utf8_lossy(s.payload())))
                    .collect::<String>()
            })
            .unwrap_or_default();
        state.calls.push(MockCall::OpenNode(rendered.clone()));

        if let Some(status) = state.injected(|f| match f {
            InjectedFailure::NodeOpen(status) => Some(*status),
            _ => None,
        }) {
            return Err(status);
        }

        let scope = state
            .scope_for_path(&rendered)
            .ok_or(INVALID_REFERENCE_STATUS)?;
        let node = state.handle();
        state.nodes.insert(node, scope);
        Ok(node)
    }

    fn close_node(&self, node: u32) -> DirStatus {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::CloseNode);
        let released = state.nodes.remove(&node).is_some();
        state.release_status(released)
    }

    fn record_list(
        &self,
        node: u32,
        buffer: u32,
        query: &RecordQuery<u32>,
    ) -> Result<RecordPage<u32>, DirStatus> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::RecordList);
        if let Some(status) = state.injected(|f| match f {
            InjectedFailure::RecordList(status) => Some(*status),
            _ => None,
        }) {
            return Err(status);
        }

        let scope = *state.nodes.get(&node).ok_or(INVALID_REFERENCE_STATUS)?;
        if !state.buffers.contains_key(&buffer) {
            return Err(INVALID_REFERENCE_STATUS);
        }

        let first_value = |list: u32| -> Option<String> {
            state
                .lists
                .get(&list)
                .and_then(|entries| entries.first())
                .and_then(|entry| entry.as_str().ok().map(str::to_string))
        };
        let name = first_value(query.names).ok_or(INVALID_REFERENCE_STATUS)?;
        let record_type = first_value(query.record_types).ok_or(INVALID_REFERENCE_STATUS)?;
        first_value(query.attributes).ok_or(INVALID_REFERENCE_STATUS)?;

        let searched: &[SearchScope] = match scope {
            SearchScope::CombinedLocalAndNetwork => &[
                SearchScope::LocalOnly,
                SearchScope::NetworkOnly,
                SearchScope::CombinedLocalAndNetwork,
            ],
            SearchScope::LocalOnly => &[SearchScope::LocalOnly],
            SearchScope::NetworkOnly => &[SearchScope::NetworkOnly],
        };

        let count = if record_type == USER_RECORD_TYPE && query.match_type == EXACT_MATCH {
            searched
                .iter()
                .filter_map(|scope| state.users.get(scope))
                .flatten()
                .filter(|user| **user == name)
                .count() as u32
        } else {
            0
        };

        let continuation = if state.paged_results {
            let handle = state.handle();
            state.continuations.insert(handle);
            Some(handle)
        } else {
            None
        };

        Ok(RecordPage {
            count,
            continuation,
        })
    }

    fn release_continuation(&self, _node: u32, continuation: u32) -> DirStatus {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::ReleaseContinuation);
        let released = state.continuations.remove(&continuation);
        state.release_status(released)
    }
}
