//! Integration tests for photosort-drive
//!
//! Uses wiremock to simulate the Drive API and verifies end-to-end behavior
//! of the client: children listing with pagination, change feed paging,
//! backoff on transient failures, and error-taxonomy mapping.

mod common;

mod test_changes;
mod test_children;
mod test_errors;
