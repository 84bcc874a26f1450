//! Side-effecting adapters: configuration, remote APIs and local storage.

pub mod airtable;
pub mod config;
pub(crate) mod http;
pub mod oauth;
pub mod store;
