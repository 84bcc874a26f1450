//! Stable exit codes for formbridge CLI commands.

/// Command succeeded; for `preview`, the answers would be accepted.
pub const OK: i32 = 0;
/// Bad input files, an invalid form definition or another error.
pub const INVALID: i32 = 1;
/// `formbridge preview` found validation errors in the answers.
pub const REJECTED: i32 = 2;
