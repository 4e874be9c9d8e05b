//! Platform selection of the directory service
//!
//! Only macOS ships the DirectoryService framework. Elsewhere the CLI still
//! builds, and every command that needs the directory fails up front.

use crate::error::CliResult;

#[cfg(target_os = "macos")]
pub type SystemDirectory = nomadize_core::NativeDirectoryService;

#[cfg(not(target_os = "macos"))]
pub type SystemDirectory = unsupported::UnsupportedDirectory;

/// The directory service of this machine
#[cfg(target_os = "macos")]
pub fn system_directory() -> CliResult<SystemDirectory> {
    Ok(nomadize_core::NativeDirectoryService)
}

/// The directory service of this machine
#[cfg(not(target_os = "macos"))]
pub fn system_directory() -> CliResult<SystemDirectory> {
    Err(crate::error::CliError::unsupported_platform())
}

#[cfg(not(target_os = "macos"))]
pub mod unsupported {
    use nomadize_core::directory::{DataNode, RecordPage, RecordQuery};
    use nomadize_core::error::{DirStatus, StageFailure};
    use nomadize_core::{DirectoryService, SearchScope};

    /// Uninhabited stand-in; no value of this type can exist
    #[derive(Debug)]
    pub enum UnsupportedDirectory {}

    impl DirectoryService for UnsupportedDirectory {
        type Session = u32;
        type Node = u32;
        type Buffer = u32;
        type List = u32;
        type Continuation = u32;

        fn open_session(&self) -> Result<u32, DirStatus> {
            match *self {}
        }

        fn close_session(&self, _session: u32) -> DirStatus {
            match *self {}
        }

        fn allocate_buffer(&self, _session: u32, _capacity: u32) -> Option<u32> {
            match *self {}
        }

        fn deallocate_buffer(&self, _session: u32, _buffer: u32) -> DirStatus {
            match *self {}
        }

        fn find_nodes(&self, _session: u32, _buffer: u32, _scope: SearchScope) -> Result<u32, DirStatus> {
            match *self {}
        }

        fn node_name(&self, _session: u32, _buffer: u32, _index: u32) -> Result<u32, DirStatus> {
            match *self {}
        }

        fn build_list(&self, _session: u32, _value: &str) -> Option<u32> {
            match *self {}
        }

        fn list_entries(&self, _session: u32, _list: u32) -> Result<Vec<DataNode>, StageFailure> {
            match *self {}
        }

        fn deallocate_list(&self, _session: u32, _list: u32) -> DirStatus {
            match *self {}
        }

        fn open_node(&self, _session: u32, _path: u32) -> Result<u32, DirStatus> {
            match *self {}
        }

        fn close_node(&self, _node: u32) -> DirStatus {
            match *self {}
        }

        fn record_list(
            &self,
            _node: u32,
            _buffer: u32,
            _query: &RecordQuery<u32>,
        ) -> Result<RecordPage<u32>, DirStatus> {
            match *self {}
        }

        fn release_continuation(&self, _node: u32, _continuation: u32) -> DirStatus {
            match *self {}
        }
    }
}
