//! Component dialect for compbridge previews.
//!
//! A JavaScript/JSX subset with a React-style runtime: [`parse`] turns
//! source into a [`Program`], a [`Realm`] evaluates it and mounts a
//! component, and the rendered output is a [`VNode`] tree.
//!
//! Realms are single-threaded and hold `Rc` state; create one per mount on
//! the thread that will run it.

pub mod ast;
mod builtins;
pub mod error;
mod hooks;
mod interpreter;
mod lexer;
mod parser;
mod realm;
mod render;
mod timers;
mod value;
pub mod vdom;

/// Dialect identifier a preview document must request to be compiled here.
pub const DIALECT: &str = "jsx-react18";

pub use ast::Program;
pub use error::{Result, ScriptError};
pub use parser::parse_program as parse;
pub use realm::{DEFAULT_MAX_CALL_DEPTH, Realm, RealmOptions};
pub use value::Value;
pub use vdom::{VNode, is_visually_empty, to_html, visible_text};
