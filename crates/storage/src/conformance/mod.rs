//! Conformance test suite for `AchievementStore` implementations.
//!
//! A backend-agnostic suite any `AchievementStore` implementation can run
//! to verify correctness. Coverage:
//!
//! - **Initialization**: record creation, duplicate detection
//! - **Version validation / OCC**: conflict detection, version numbering
//! - **Atomic commit**: all-or-nothing semantics, rollback on abort/drop
//! - **Concurrency**: real `tokio::spawn` races against the version check
//! - **Event coupling**: append order, audit survival across tombstoning
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory that
//! creates a fresh, empty store for each test:
//!
//! ```ignore
//! use laurel_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn postgres_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_postgres_store().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod commit;
mod concurrent;
mod events;
mod init;
mod version;

use std::fmt;
use std::future::Future;

use laurel_core::AchievementRecord;

use crate::AchievementStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "init", "version", "commit").
    pub category: String,
    /// Test name.
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self {
                category: category.to_string(),
                name: name.to_string(),
                passed: true,
                message: None,
            },
            Err(msg) => Self {
                category: category.to_string(),
                name: name.to_string(),
                passed: false,
                message: Some(msg),
            },
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL {}/{}: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a backend.
///
/// The factory must return a fresh, empty store on each call; tests do not
/// share state.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: AchievementStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();
    results.extend(init::run_init_tests(&factory).await);
    results.extend(version::run_version_tests(&factory).await);
    results.extend(commit::run_commit_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);
    results.extend(events::run_event_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;
    ConformanceReport {
        passed,
        failed,
        total: results.len(),
        results,
    }
}

/// A minimal draft record for suite tests.
pub(crate) fn sample_record(id: &str, owner_id: &str) -> AchievementRecord {
    AchievementRecord::new_draft(
        id.to_string(),
        owner_id.to_string(),
        format!("Project {}", id),
        "science".to_string(),
        vec![],
        "2026-01-01T00:00:00Z".to_string(),
    )
}
