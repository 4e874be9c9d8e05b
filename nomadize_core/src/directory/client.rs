//! Directory query client
//!
//! Runs the daemon's lookup sequence for a single account name:
//!
//! 1. open a session
//! 2. enumerate the search node for the scope into a small buffer
//! 3. read the node's name, then release the small buffer
//! 4. allocate a larger buffer for record payloads
//! 5. open the node and run an exact-match user lookup
//!
//! Every handle is a guard, so each exit path releases what was acquired.

use super::guard::{Buffer, Node, Session, TermList};
use super::record::render_node_path;
use super::service::DirectoryService;
use super::{EXACT_MATCH, NATIVE_NAME_ATTRIBUTE, QueryConfig, SearchScope, USER_RECORD_TYPE};
use crate::error::{QueryError, QueryStage, Result, StageFailure, ValidationError};
use log::{debug, trace};

/// Client answering "does this account exist?" against a directory daemon
///
/// The client owns its [`DirectoryService`]; construct one per run and pass
/// it to whatever needs lookups.
#[derive(Debug)]
pub struct DirectoryQueryClient<S: DirectoryService> {
    service: S,
    config: QueryConfig,
}

impl<S: DirectoryService> DirectoryQueryClient<S> {
    /// Create a client with the default configuration
    pub fn new(service: S) -> Self {
        Self::with_config(service, QueryConfig::default())
    }

    /// Create a client with a specific configuration
    pub fn with_config(service: S, config: QueryConfig) -> Self {
        Self { service, config }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Count user records named exactly `account_name` within `scope`
    ///
    /// `Ok(0)` means the account is absent. A [`crate::Error::Directory`]
    /// means existence could not be determined and must not be read as absent.
    pub fn resolve_user_exists(&self, account_name: &str, scope: SearchScope) -> Result<u32> {
        if account_name.is_empty() {
            return Err(
                ValidationError::invalid_parameter("account_name", "must not be empty").into(),
            );
        }

        debug!("Looking up user '{account_name}' in {scope} scope");
        let result = self.query(account_name, scope);
        match &result {
            Ok(count) => debug!("Lookup for '{account_name}' matched {count} record(s)"),
            Err(err) => debug!(
                "Lookup for '{account_name}' failed (code {}): {err}",
                err.code()
            ),
        }
        Ok(result?)
    }

    fn query(&self, account_name: &str, scope: SearchScope) -> std::result::Result<u32, QueryError> {
        let session = Session::open(&self.service)
            .map_err(|status| QueryError::status(QueryStage::Session, status))?;

        let node_path = self.locate_search_node(&session, scope)?;

        let record_buffer = Buffer::allocate(&session, self.config.record_buffer_size)
            .ok_or_else(|| {
                QueryError::new(
                    QueryStage::RecordList,
                    StageFailure::BufferAllocation(self.config.record_buffer_size),
                )
            })?;

        let node = Node::open(&session, &node_path)
            .map_err(|status| QueryError::status(QueryStage::NodeOpen, status))?;

        let names = build_term(&session, account_name)?;
        let record_types = build_term(&session, USER_RECORD_TYPE)?;
        let attributes = build_term(&session, NATIVE_NAME_ATTRIBUTE)?;

        node.record_list(
            &record_buffer,
            &names,
            EXACT_MATCH,
            &record_types,
            &attributes,
        )
        .map_err(|status| QueryError::status(QueryStage::RecordList, status))
    }

    /// Find the single search node for `scope` and return its name list
    ///
    /// The enumeration buffer is released before this returns; the daemon
    /// cannot grow it for the heavier record lookup.
    fn locate_search_node<'s, 'a>(
        &self,
        session: &'s Session<'a, S>,
        scope: SearchScope,
    ) -> std::result::Result<TermList<'s, 'a, S>, QueryError> {
        let buffer = Buffer::allocate(session, self.config.node_buffer_size).ok_or_else(|| {
            QueryError::new(
                QueryStage::NodeDiscovery,
                StageFailure::BufferAllocation(self.config.node_buffer_size),
            )
        })?;

        let count = buffer
            .find_nodes(scope)
            .map_err(|status| QueryError::status(QueryStage::NodeDiscovery, status))?;
        if count != 1 {
            return Err(QueryError::new(
                QueryStage::NodeDiscovery,
                StageFailure::NodeCount(count),
            ));
        }

        let node_path = buffer
            .node_name(1)
            .map_err(|status| QueryError::status(QueryStage::NodeName, status))?;

        let segments = node_path
            .entries()
            .map_err(|failure| QueryError::new(QueryStage::NodeName, failure))?;
        let rendered = render_node_path(&segments)
            .map_err(|err| QueryError::new(QueryStage::NodeName, err.into()))?;
        trace!("Search node for {scope} scope is {rendered}");

        Ok(node_path)
    }
}

fn build_term<'s, 'a, S: DirectoryService>(
    session: &'s Session<'a, S>,
    value: &str,
) -> std::result::Result<TermList<'s, 'a, S>, QueryError> {
    TermList::build(session, value).ok_or_else(|| {
        QueryError::new(
            QueryStage::RecordList,
            StageFailure::ListAllocation(value.to_string()),
        )
    })
}
