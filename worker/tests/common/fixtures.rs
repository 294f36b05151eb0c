//! Test fixtures and data for worker tests
//!
//! This module provides consistent test data and fixtures used across all test suites.

use shared::ContextId;

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Context identity
    pub const CONTEXT_ID: &'static str = "ctx-fixture";
    pub const VERSION: &'static str = "1718000000";
    pub const ADDRESS: &'static str = "http://localhost:63315/__tester__/?contextId=ctx-fixture&browserv=1718000000";
    pub const RELOADED_ADDRESS: &'static str =
        "http://localhost:63315/__tester__/?contextId=ctx-fixture&browserv=1718000001&reloadStart=1700000000000";

    /// Standard test files
    pub const FILE_A: &'static str = "a.test";
    pub const FILE_B: &'static str = "b.test";

    pub const PROJECT_ROOT: &'static str = "/project";

    pub fn context_id() -> ContextId {
        ContextId::new(Self::CONTEXT_ID)
    }

    /// The two-file batch most scenarios run
    pub fn batch() -> Vec<String> {
        vec![Self::FILE_A.to_string(), Self::FILE_B.to_string()]
    }

    /// Timeline entry of the done notification for [`TestFixtures::batch`]
    pub fn batch_done() -> String {
        format!("done:{},{}", Self::FILE_A, Self::FILE_B)
    }
}
