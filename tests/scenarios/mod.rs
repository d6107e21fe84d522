//! Scenario-based tests for release-runner

mod error_markers;
mod failure_handling;
mod release_notes;
mod success_chain;
