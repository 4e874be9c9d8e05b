//! Scoped daemon handles
//!
//! Each guard owns one daemon resource and releases it in `Drop`, so a query
//! that bails out early with `?` still releases everything it acquired.
//! Guards borrow the [`Session`] they were created from, which keeps the
//! session open until every dependent handle is gone.

use super::SearchScope;
use super::record::DataNode;
use super::service::{DirectoryService, RecordQuery, STATUS_OK};
use crate::error::{DirStatus, StageFailure};
use log::{trace, warn};

fn log_release(kind: &str, status: DirStatus) {
    if status == STATUS_OK {
        trace!("Released directory {kind}");
    } else {
        warn!("Releasing directory {kind} returned status {status}");
    }
}

/// An open daemon session
#[derive(Debug)]
pub struct Session<'a, S: DirectoryService> {
    service: &'a S,
    handle: S::Session,
}

impl<'a, S: DirectoryService> Session<'a, S> {
    /// Open a session
    pub fn open(service: &'a S) -> Result<Self, DirStatus> {
        let handle = service.open_session()?;
        trace!("Opened directory session {handle:?}");
        Ok(Self { service, handle })
    }

    pub fn handle(&self) -> S::Session {
        self.handle
    }

    pub fn service(&self) -> &'a S {
        self.service
    }
}

impl<S: DirectoryService> Drop for Session<'_, S> {
    fn drop(&mut self) {
        log_release("session", self.service.close_session(self.handle));
    }
}

/// A daemon-allocated buffer
#[derive(Debug)]
pub struct Buffer<'s, 'a, S: DirectoryService> {
    session: &'s Session<'a, S>,
    handle: S::Buffer,
    capacity: u32,
}

impl<'s, 'a, S: DirectoryService> Buffer<'s, 'a, S> {
    /// Allocate a buffer; `None` if the daemon refused
    pub fn allocate(session: &'s Session<'a, S>, capacity: u32) -> Option<Self> {
        let handle = session.service.allocate_buffer(session.handle, capacity)?;
        trace!("Allocated {capacity}-byte directory buffer {handle:?}");
        Some(Self {
            session,
            handle,
            capacity,
        })
    }

    pub fn handle(&self) -> S::Buffer {
        self.handle
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Enumerate nodes for `scope` into this buffer
    pub fn find_nodes(&self, scope: SearchScope) -> Result<u32, DirStatus> {
        self.session
            .service
            .find_nodes(self.session.handle, self.handle, scope)
    }

    /// Read the name of an enumerated node; the list outlives this buffer
    pub fn node_name(&self, index: u32) -> Result<TermList<'s, 'a, S>, DirStatus> {
        let handle = self
            .session
            .service
            .node_name(self.session.handle, self.handle, index)?;
        Ok(TermList {
            session: self.session,
            handle,
        })
    }
}

impl<S: DirectoryService> Drop for Buffer<'_, '_, S> {
    fn drop(&mut self) {
        log_release(
            "buffer",
            self.session
                .service
                .deallocate_buffer(self.session.handle, self.handle),
        );
    }
}

/// A daemon-side string list
#[derive(Debug)]
pub struct TermList<'s, 'a, S: DirectoryService> {
    session: &'s Session<'a, S>,
    handle: S::List,
}

impl<'s, 'a, S: DirectoryService> TermList<'s, 'a, S> {
    /// Build a single-entry list; `None` if the daemon refused
    pub fn build(session: &'s Session<'a, S>, value: &str) -> Option<Self> {
        let handle = session.service.build_list(session.handle, value)?;
        Some(Self { session, handle })
    }

    pub fn handle(&self) -> S::List {
        self.handle
    }

    /// Decoded list entries
    pub fn entries(&self) -> Result<Vec<DataNode>, StageFailure> {
        self.session
            .service
            .list_entries(self.session.handle, self.handle)
    }
}

impl<S: DirectoryService> Drop for TermList<'_, '_, S> {
    fn drop(&mut self) {
        log_release(
            "list",
            self.session
                .service
                .deallocate_list(self.session.handle, self.handle),
        );
    }
}

/// An open directory node
#[derive(Debug)]
pub struct Node<'s, 'a, S: DirectoryService> {
    session: &'s Session<'a, S>,
    handle: S::Node,
}

impl<'s, 'a, S: DirectoryService> Node<'s, 'a, S> {
    /// Open the node named by `path`
    pub fn open(session: &'s Session<'a, S>, path: &TermList<'_, 'a, S>) -> Result<Self, DirStatus> {
        let handle = session.service.open_node(session.handle, path.handle)?;
        trace!("Opened directory node {handle:?}");
        Ok(Self { session, handle })
    }

    pub fn handle(&self) -> S::Node {
        self.handle
    }

    /// Run one page of a record lookup and return the match count
    ///
    /// Continuation data for further pages is released immediately.
    pub fn record_list(
        &self,
        buffer: &Buffer<'_, 'a, S>,
        names: &TermList<'_, 'a, S>,
        match_type: u32,
        record_types: &TermList<'_, 'a, S>,
        attributes: &TermList<'_, 'a, S>,
    ) -> Result<u32, DirStatus> {
        let query = RecordQuery {
            names: names.handle,
            match_type,
            record_types: record_types.handle,
            attributes: attributes.handle,
            attribute_info_only: false,
        };

        let page = self
            .session
            .service
            .record_list(self.handle, buffer.handle, &query)?;

        if let Some(continuation) = page.continuation {
            trace!("Record lookup has further pages; releasing continuation");
            log_release(
                "continuation",
                self.session
                    .service
                    .release_continuation(self.handle, continuation),
            );
        }

        Ok(page.count)
    }
}

impl<S: DirectoryService> Drop for Node<'_, '_, S> {
    fn drop(&mut self) {
        log_release("node", self.session.service.close_node(self.handle));
    }
}
