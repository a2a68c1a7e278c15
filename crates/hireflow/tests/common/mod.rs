//! Shared test utilities for hireflow integration tests.
//!
//! This module provides:
//! - `TestHarness`: an in-memory database, a job store and a supervisor
//!   wired to scripted collaborators
//! - Scripted collaborator doubles whose failures and delays are set per test
//! - Builders for resumes, uploads and configs

pub mod builders;
pub mod doubles;
pub mod harness;

pub use builders::*;
pub use doubles::*;
pub use harness::{assert_status, TestHarness};
