//! macOS DirectoryService framework binding
//!
//! Thin `extern "C"` declarations plus a [`DirectoryService`] implementation
//! over them. Record layouts coming back from the framework are copied out
//! and decoded with [`DataNode::decode`]; no raw pointer leaves this module.

use super::SearchScope;
use super::record::{DATA_NODE_HEADER_SIZE, DataNode};
use super::service::{DirectoryService, RecordPage, RecordQuery, STATUS_OK};
use crate::error::{DecodeError, DirStatus, StageFailure};
use log::warn;
use std::ffi::{CString, c_char, c_void};
use std::ptr;

/* ========================================================================== */
/*                              Type Definitions                               */
/* ========================================================================== */

type TDirReference = u32;
type TDirNodeReference = u32;
type TDirStatus = i32;
type TContextData = *mut c_void;

/// `tDataBuffer`: header followed by a variable-length data region
#[repr(C)]
#[derive(Debug)]
pub struct TDataBuffer {
    buffer_size: u32,
    buffer_length: u32,
    buffer_data: [c_char; 1],
}

type TDataNode = TDataBuffer;

/// `tDataList`: count plus an opaque head pointer
#[repr(C)]
#[derive(Debug)]
pub struct TDataList {
    data_node_count: u32,
    data_list_head: *mut TDataNode,
}

#[link(name = "DirectoryService", kind = "framework")]
unsafe extern "C" {
    fn dsOpenDirService(out_dir_ref: *mut TDirReference) -> TDirStatus;
    fn dsCloseDirService(dir_ref: TDirReference) -> TDirStatus;

    fn dsDataBufferAllocate(dir_ref: TDirReference, size: u32) -> *mut TDataBuffer;
    fn dsDataBufferDeAllocate(dir_ref: TDirReference, buffer: *mut TDataBuffer) -> TDirStatus;

    fn dsFindDirNodes(
        dir_ref: TDirReference,
        buffer: *mut TDataBuffer,
        node_name_pattern: *mut TDataList,
        pattern_match: u32,
        out_node_count: *mut u32,
        io_continue_data: *mut TContextData,
    ) -> TDirStatus;
    fn dsGetDirNodeName(
        dir_ref: TDirReference,
        buffer: *mut TDataBuffer,
        node_index: u32,
        out_data_list: *mut *mut TDataList,
    ) -> TDirStatus;

    fn dsOpenDirNode(
        dir_ref: TDirReference,
        node_name: *mut TDataList,
        out_node_ref: *mut TDirNodeReference,
    ) -> TDirStatus;
    fn dsCloseDirNode(node_ref: TDirNodeReference) -> TDirStatus;

    fn dsBuildListFromStrings(dir_ref: TDirReference, first: *const c_char, ...)
    -> *mut TDataList;
    fn dsDataListDeallocate(dir_ref: TDirReference, list: *mut TDataList) -> TDirStatus;
    fn dsDataListGetNodeCount(list: *const TDataList) -> u32;
    fn dsDataListGetNodeAlloc(
        dir_ref: TDirReference,
        list: *const TDataList,
        node_index: u32,
        out_node: *mut *mut TDataNode,
    ) -> TDirStatus;
    fn dsDataNodeDeAllocate(dir_ref: TDirReference, node: *mut TDataNode) -> TDirStatus;

    fn dsGetRecordList(
        node_ref: TDirNodeReference,
        buffer: *mut TDataBuffer,
        record_names: *mut TDataList,
        pattern_match: u32,
        record_types: *mut TDataList,
        attribute_types: *mut TDataList,
        attribute_info_only: u32,
        io_record_count: *mut u32,
        io_continue_data: *mut TContextData,
    ) -> TDirStatus;
    fn dsReleaseContinueData(reference: u32, continue_data: TContextData) -> TDirStatus;
}

/// Copy a data node's header and declared payload out of framework memory
///
/// # Safety
/// `node` must point to a live `tDataNode` whose data region holds at least
/// `buffer_length` bytes.
unsafe fn copy_data_node(node: *const TDataNode) -> Result<DataNode, DecodeError> {
    let length = unsafe { (*node).buffer_length } as usize;
    let bytes =
        unsafe { std::slice::from_raw_parts(node.cast::<u8>(), DATA_NODE_HEADER_SIZE + length) };
    DataNode::decode(&mut &bytes[..])
}

/// [`DirectoryService`] backed by the system DirectoryService framework
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeDirectoryService;

impl NativeDirectoryService {
    pub fn new() -> Self {
        Self
    }
}

impl DirectoryService for NativeDirectoryService {
    type Session = TDirReference;
    type Node = TDirNodeReference;
    type Buffer = *mut TDataBuffer;
    type List = *mut TDataList;
    type Continuation = TContextData;

    fn open_session(&self) -> Result<Self::Session, DirStatus> {
        let mut dir_ref: TDirReference = 0;
        let status = unsafe { dsOpenDirService(&mut dir_ref) };
        if status != STATUS_OK {
            return Err(status);
        }
        Ok(dir_ref)
    }

    fn close_session(&self, session: Self::Session) -> DirStatus {
        unsafe { dsCloseDirService(session) }
    }

    fn allocate_buffer(&self, session: Self::Session, capacity: u32) -> Option<Self::Buffer> {
        let buffer = unsafe { dsDataBufferAllocate(session, capacity) };
        (!buffer.is_null()).then_some(buffer)
    }

    fn deallocate_buffer(&self, session: Self::Session, buffer: Self::Buffer) -> DirStatus {
        unsafe { dsDataBufferDeAllocate(session, buffer) }
    }

    fn find_nodes(
        &self,
        session: Self::Session,
        buffer: Self::Buffer,
        scope: SearchScope,
    ) -> Result<u32, DirStatus> {
        let mut count = 0u32;
        let mut continuation: TContextData = ptr::null_mut();
        let status = unsafe {
            dsFindDirNodes(
                session,
                buffer,
                ptr::null_mut(),
                scope.protocol_value(),
                &mut count,
                &mut continuation,
            )
        };
        if !continuation.is_null() {
            let release = unsafe { dsReleaseContinueData(session, continuation) };
            if release != STATUS_OK {
                warn!("Releasing node enumeration continuation returned status {release}");
            }
        }
        if status != STATUS_OK {
            return Err(status);
        }
        Ok(count)
    }

    fn node_name(
        &self,
        session: Self::Session,
        buffer: Self::Buffer,
        index: u32,
    ) -> Result<Self::List, DirStatus> {
        let mut list: *mut TDataList = ptr::null_mut();
        let status = unsafe { dsGetDirNodeName(session, buffer, index, &mut list) };
        if status != STATUS_OK {
            return Err(status);
        }
        Ok(list)
    }

    fn build_list(&self, session: Self::Session, value: &str) -> Option<Self::List> {
        let value = CString::new(value).ok()?;
        let list = unsafe {
            dsBuildListFromStrings(session, value.as_ptr(), ptr::null::<c_char>())
        };
        (!list.is_null()).then_some(list)
    }

    fn list_entries(
        &self,
        session: Self::Session,
        list: Self::List,
    ) -> Result<Vec<DataNode>, StageFailure> {
        let count = unsafe { dsDataListGetNodeCount(list) };
        let mut entries = Vec::with_capacity(count as usize);

        for index in 1..=count {
            let mut node: *mut TDataNode = ptr::null_mut();
            let status = unsafe { dsDataListGetNodeAlloc(session, list, index, &mut node) };
            if status != STATUS_OK {
                return Err(StageFailure::Status(status));
            }
            if node.is_null() {
                return Err(DecodeError::TruncatedHeader {
                    needed: DATA_NODE_HEADER_SIZE,
                    available: 0,
                }
                .into());
            }
            let decoded = unsafe { copy_data_node(node) };
            let released = unsafe { dsDataNodeDeAllocate(session, node) };
            if released != STATUS_OK {
                warn!("Releasing directory list entry {index} returned status {released}");
            }
            entries.push(decoded?);
        }

        Ok(entries)
    }

    fn deallocate_list(&self, session: Self::Session, list: Self::List) -> DirStatus {
        // The framework frees the entries; the list header itself is ours
        let status = unsafe { dsDataListDeallocate(session, list) };
        unsafe { libc::free(list.cast::<c_void>()) };
        status
    }

    fn open_node(&self, session: Self::Session, path: Self::List) -> Result<Self::Node, DirStatus> {
        let mut node_ref: TDirNodeReference = 0;
        let status = unsafe { dsOpenDirNode(session, path, &mut node_ref) };
        if status != STATUS_OK {
            return Err(status);
        }
        Ok(node_ref)
    }

    fn close_node(&self, node: Self::Node) -> DirStatus {
        unsafe { dsCloseDirNode(node) }
    }

    fn record_list(
        &self,
        node: Self::Node,
        buffer: Self::Buffer,
        query: &RecordQuery<Self::List>,
    ) -> Result<RecordPage<Self::Continuation>, DirStatus> {
        let mut count = 0u32;
        let mut continuation: TContextData = ptr::null_mut();
        let status = unsafe {
            dsGetRecordList(
                node,
                buffer,
                query.names,
                query.match_type,
                query.record_types,
                query.attributes,
                u32::from(query.attribute_info_only),
                &mut count,
                &mut continuation,
            )
        };
        if status != STATUS_OK {
            return Err(status);
        }
        Ok(RecordPage {
            count,
            continuation: (!continuation.is_null()).then_some(continuation),
        })
    }

    fn release_continuation(
        &self,
        node: Self::Node,
        continuation: Self::Continuation,
    ) -> DirStatus {
        unsafe { dsReleaseContinueData(node, continuation) }
    }
}
