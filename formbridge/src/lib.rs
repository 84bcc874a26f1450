//! Conditional form engine backed by a remote table API.
//!
//! A form is an ordered list of typed questions bound to remote columns, with
//! optional show/hide rules. A submission is validated in one pass and, when
//! every question passes, written as a single remote row.
//!
//! - **[`core`]**: Pure, deterministic logic (rule evaluation, answer
//!   validation, submission normalization, PKCE). No I/O.
//! - **[`io`]**: Side-effecting adapters (config, JSON store, remote API and
//!   OAuth clients) behind traits so tests can script them.
//!
//! Orchestration modules ([`forms`], [`submit`], [`accounts`]) combine the two
//! for the CLI and the HTTP server.

pub mod accounts;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod forms;
pub mod io;
pub mod logging;
pub mod submit;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
