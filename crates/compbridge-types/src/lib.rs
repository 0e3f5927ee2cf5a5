//! Shared types for the compbridge component preview system.
//!
//! The types here cross crate boundaries: the fault protocol posted by the
//! sandbox, the records kept by the error console, and the snippet shapes
//! exchanged with the storage and catalog collaborators.

pub mod fault;
pub mod message;
pub mod snippet;

pub use fault::{FaultKind, FaultRecord};
pub use message::{EMPTY_RENDER_MESSAGE, FaultMessage};
pub use snippet::{Snippet, Template};
