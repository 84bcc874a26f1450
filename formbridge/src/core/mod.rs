//! Deterministic, pure logic for form submissions.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests. The
//! one exception is [`pkce`], which draws from the OS random number generator.

pub mod answer;
pub mod field_map;
pub mod form;
pub mod invariants;
pub mod pkce;
pub mod rules;
pub mod submission;
pub mod types;
