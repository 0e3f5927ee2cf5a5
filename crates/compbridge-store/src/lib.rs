//! Persistence collaborators for compbridge.
//!
//! - [`SnippetStore`]: user snippets in a single JSON file
//! - [`catalog`]: read-only built-in templates

pub mod catalog;
pub mod error;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{NewSnippet, SnippetStore};
