//! Sandboxed preview engine for JSX components.
//!
//! A [`PreviewSession`] turns source text and a JSON input blob into a
//! [`PreviewDocument`], mounts it in a fresh sandbox on every change and
//! collects the faults the sandbox posts back:
//!
//! - `compile-error`: parsing, module evaluation or entry resolution failed
//! - `runtime-error`: the component threw during or after render
//! - `empty-render`: the render succeeded but showed nothing
//!
//! Faults land in the session's [`ErrorConsole`]; invalid input only ever
//! reaches the validation slot.

pub mod binder;
pub mod console;
pub mod document;
pub mod entry;
pub mod error;
pub mod export;
pub mod host;
mod html;
pub mod reporter;
pub mod session;
pub mod surface;

pub use binder::{Resolution, resolve, sample_input};
pub use console::ErrorConsole;
pub use document::{Instrumentation, PreviewDocument, Synthesizer};
pub use entry::{DefaultExport, EntryResolver, FirstDeclaration, resolver_for};
pub use error::{ExportError, PreviewError, Result};
pub use export::{ExportOptions, to_svg, write_svg};
pub use host::{ExecutionHost, HostOptions, MountHandle, SharedSurface};
pub use reporter::{ActiveMount, Envelope, MountId, Phase, Reporter, classify};
pub use session::PreviewSession;
pub use surface::Surface;
