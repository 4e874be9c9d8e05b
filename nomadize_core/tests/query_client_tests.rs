//! Directory query client tests
//!
//! Every test runs the full query sequence against the mock daemon and then
//! checks that each acquired handle was released exactly once.

use nomadize_core::directory::{DirectoryQueryClient, QueryConfig, QueryOutcome, SearchScope};
use nomadize_core::error::{QueryStage, StageFailure};
use nomadize_core::{Error, Result};
use nomadize_test_utils::mocks::MOCK_FAILURE_STATUS;
use nomadize_test_utils::{InjectedFailure, MockCall, MockDirectoryService};

fn query(mock: &MockDirectoryService, name: &str, scope: SearchScope) -> Result<u32> {
    DirectoryQueryClient::new(mock.clone()).resolve_user_exists(name, scope)
}

fn assert_no_leaks(mock: &MockDirectoryService) {
    assert!(
        mock.outstanding().is_clean(),
        "handles left open: {:?}",
        mock.outstanding()
    );
    assert_eq!(mock.invalid_releases(), 0, "a handle was released twice");
}

fn stage_code(result: Result<u32>) -> i32 {
    match result {
        Err(Error::Directory(err)) => err.code(),
        other => panic!("expected a directory error, got {other:?}"),
    }
}

#[cfg(test)]
mod successful_queries {
    use super::*;

    /// Zero matches with every stage succeeding is 0, never negative
    #[test]
    fn test_absent_user_is_zero() {
        let mock = MockDirectoryService::new().with_user(SearchScope::NetworkOnly, "bob");

        let count = query(&mock, "alice", SearchScope::NetworkOnly).unwrap();

        assert_eq!(count, 0);
        assert_no_leaks(&mock);
    }

    #[test]
    fn test_present_user_is_counted() {
        let mock = MockDirectoryService::new()
            .with_user(SearchScope::NetworkOnly, "alice")
            .with_user(SearchScope::NetworkOnly, "alice");

        assert_eq!(query(&mock, "alice", SearchScope::NetworkOnly).unwrap(), 2);
        assert_no_leaks(&mock);
    }

    #[test]
    fn test_match_is_exact() {
        let mock = MockDirectoryService::new().with_user(SearchScope::NetworkOnly, "alice");

        assert_eq!(query(&mock, "alic", SearchScope::NetworkOnly).unwrap(), 0);
        assert_eq!(query(&mock, "Alice", SearchScope::NetworkOnly).unwrap(), 0);
    }

    #[test]
    fn test_scopes_search_their_own_nodes() {
        let mock = MockDirectoryService::new().with_user(SearchScope::LocalOnly, "admin");

        assert_eq!(query(&mock, "admin", SearchScope::NetworkOnly).unwrap(), 0);
        assert_eq!(query(&mock, "admin", SearchScope::LocalOnly).unwrap(), 1);
        assert_eq!(
            query(&mock, "admin", SearchScope::CombinedLocalAndNetwork).unwrap(),
            1
        );
        assert!(mock.calls().contains(&MockCall::OpenNode("/Local/Default".to_string())));
        assert!(mock.calls().contains(&MockCall::OpenNode("/Search/Contacts".to_string())));
    }

    /// Repeating a query gives the same answer and holds nothing between runs
    #[test]
    fn test_repeated_queries_are_idempotent() {
        let mock = MockDirectoryService::new().with_user(SearchScope::NetworkOnly, "alice");
        let client = DirectoryQueryClient::new(mock.clone());

        let results: Vec<u32> = (0..3)
            .map(|_| {
                client
                    .resolve_user_exists("alice", SearchScope::NetworkOnly)
                    .unwrap()
            })
            .collect();

        assert_eq!(results, [1, 1, 1]);
        assert_no_leaks(&mock);
        assert_eq!(mock.count_calls(|c| *c == MockCall::OpenSession), 3);
    }

    #[test]
    fn test_continuation_is_released() {
        let mock = MockDirectoryService::new()
            .with_user(SearchScope::NetworkOnly, "alice")
            .with_paged_results();

        assert_eq!(query(&mock, "alice", SearchScope::NetworkOnly).unwrap(), 1);
        assert_eq!(mock.count_calls(|c| *c == MockCall::ReleaseContinuation), 1);
        assert_no_leaks(&mock);
    }

    /// The enumeration buffer is gone before the record buffer is requested
    #[test]
    fn test_node_buffer_released_before_record_buffer() {
        let mock = MockDirectoryService::new();
        query(&mock, "alice", SearchScope::NetworkOnly).unwrap();

        let calls = mock.calls();
        let released = calls
            .iter()
            .position(|c| *c == MockCall::DeallocateBuffer(2048))
            .unwrap();
        let allocated = calls
            .iter()
            .position(|c| *c == MockCall::AllocateBuffer(8192))
            .unwrap();
        assert!(released < allocated);
    }

    #[test]
    fn test_lookup_terms() {
        let mock = MockDirectoryService::new();
        query(&mock, "alice", SearchScope::NetworkOnly).unwrap();

        let calls = mock.calls();
        for term in ["alice", "dsRecTypeStandard:Users", "dsAttrTypeNative:name"] {
            assert!(calls.contains(&MockCall::BuildList(term.to_string())));
        }
    }

    #[test]
    fn test_configured_buffer_sizes_are_used() {
        let mock = MockDirectoryService::new();
        let config = QueryConfig {
            node_buffer_size: 1024,
            record_buffer_size: 16 * 1024,
            ..Default::default()
        };
        let client = DirectoryQueryClient::with_config(mock.clone(), config);

        client
            .resolve_user_exists("alice", SearchScope::NetworkOnly)
            .unwrap();

        assert!(mock.calls().contains(&MockCall::AllocateBuffer(1024)));
        assert!(mock.calls().contains(&MockCall::AllocateBuffer(16 * 1024)));
    }
}

#[cfg(test)]
mod failing_stages {
    use super::*;

    fn failing(failure: InjectedFailure) -> (MockDirectoryService, i32) {
        let mock = MockDirectoryService::new()
            .with_user(SearchScope::NetworkOnly, "alice")
            .with_failure(failure);
        let code = stage_code(query(&mock, "alice", SearchScope::NetworkOnly));
        (mock, code)
    }

    #[test]
    fn test_session_failure() {
        let (mock, code) = failing(InjectedFailure::Session(MOCK_FAILURE_STATUS));
        assert_eq!(code, -1);
        assert_no_leaks(&mock);
    }

    #[test]
    fn test_node_discovery_failures() {
        for failure in [
            InjectedFailure::NodeDiscovery(MOCK_FAILURE_STATUS),
            InjectedFailure::NodeCount(0),
            InjectedFailure::NodeCount(2),
            InjectedFailure::BufferAllocation(2048),
        ] {
            let (mock, code) = failing(failure.clone());
            assert_eq!(code, -2, "{failure:?}");
            assert_no_leaks(&mock);
        }
    }

    #[test]
    fn test_node_name_failures() {
        for failure in [
            InjectedFailure::NodeName(MOCK_FAILURE_STATUS),
            InjectedFailure::MalformedNodeName,
            InjectedFailure::ListEntry(MOCK_FAILURE_STATUS),
        ] {
            let (mock, code) = failing(failure.clone());
            assert_eq!(code, -3, "{failure:?}");
            assert_no_leaks(&mock);
        }
    }

    #[test]
    fn test_node_open_failure() {
        let (mock, code) = failing(InjectedFailure::NodeOpen(MOCK_FAILURE_STATUS));
        assert_eq!(code, -4);
        assert_no_leaks(&mock);
        assert_eq!(mock.count_calls(|c| *c == MockCall::DeallocateBuffer(8192)), 1);
    }

    #[test]
    fn test_record_list_failures() {
        for failure in [
            InjectedFailure::RecordList(MOCK_FAILURE_STATUS),
            InjectedFailure::BufferAllocation(8192),
            InjectedFailure::ListAllocation("alice".to_string()),
            InjectedFailure::ListAllocation("dsAttrTypeNative:name".to_string()),
        ] {
            let (mock, code) = failing(failure.clone());
            assert_eq!(code, -5, "{failure:?}");
            assert_no_leaks(&mock);
        }
    }

    /// A failing stage is not a zero count
    #[test]
    fn test_failure_is_indeterminate_not_absent() {
        let mock = MockDirectoryService::new()
            .with_failure(InjectedFailure::RecordList(MOCK_FAILURE_STATUS));

        let error = query(&mock, "alice", SearchScope::NetworkOnly).unwrap_err();

        assert!(error.is_indeterminate());
        match error {
            Error::Directory(err) => {
                let result: std::result::Result<u32, _> = Err(err);
                let outcome = QueryOutcome::from(&result);
                assert_eq!(outcome, QueryOutcome::Indeterminate(QueryStage::RecordList));
                assert!(!outcome.exists());
            }
            other => panic!("expected a directory error, got {other:?}"),
        }
    }

    #[test]
    fn test_daemon_status_is_kept() {
        let mock = MockDirectoryService::new().with_failure(InjectedFailure::NodeOpen(-14002));

        match query(&mock, "alice", SearchScope::NetworkOnly) {
            Err(Error::Directory(err)) => {
                assert_eq!(err.stage, QueryStage::NodeOpen);
                assert_eq!(err.daemon_status(), Some(-14002));
            }
            other => panic!("expected a directory error, got {other:?}"),
        }
    }

    #[test]
    fn test_node_name_entry_status_is_kept() {
        let mock = MockDirectoryService::new().with_failure(InjectedFailure::ListEntry(-14091));

        match query(&mock, "alice", SearchScope::NetworkOnly) {
            Err(Error::Directory(err)) => {
                assert_eq!(err.stage, QueryStage::NodeName);
                assert_eq!(err.daemon_status(), Some(-14091));
            }
            other => panic!("expected a directory error, got {other:?}"),
        }
        assert_no_leaks(&mock);
    }

    #[test]
    fn test_node_count_is_reported() {
        let mock = MockDirectoryService::new().with_failure(InjectedFailure::NodeCount(3));

        match query(&mock, "alice", SearchScope::NetworkOnly) {
            Err(Error::Directory(err)) => {
                assert!(matches!(err.failure, StageFailure::NodeCount(3)));
                assert_eq!(err.daemon_status(), None);
            }
            other => panic!("expected a directory error, got {other:?}"),
        }
    }

    /// Clearing a failure restores normal answers on the same daemon
    #[test]
    fn test_recovers_after_failure_is_cleared() {
        let mock = MockDirectoryService::new()
            .with_user(SearchScope::NetworkOnly, "alice")
            .with_failure(InjectedFailure::NodeOpen(MOCK_FAILURE_STATUS));

        assert_eq!(stage_code(query(&mock, "alice", SearchScope::NetworkOnly)), -4);
        mock.clear_failures();
        assert_eq!(query(&mock, "alice", SearchScope::NetworkOnly).unwrap(), 1);
        assert_no_leaks(&mock);
    }

    #[test]
    fn test_empty_name_is_rejected_before_any_call() {
        let mock = MockDirectoryService::new();

        let error = query(&mock, "", SearchScope::NetworkOnly).unwrap_err();

        assert!(matches!(error, Error::Validation(_)));
        assert!(mock.calls().is_empty());
    }
}
