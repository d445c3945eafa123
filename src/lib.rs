//! cmdlang: an embeddable command-language engine.
//!
//! Drives a tree of management commands from text lines (console, script, or
//! a remote line protocol):
//!
//!   line -> tokenize -> Interpreter walks the CommandTree -> leaf handler(CmdInfo)
//!        -> handler walks objects (for_each_*) selected by an address argument
//!        -> results stream out through an `Output` sink
//!        -> last CmdInfo release -> `Output::done`
//!
//! Key items:
//!   tokenize::tokenize      quoting / escaping aware splitter
//!   objstr::parse           `[domain][(class)][.obj]` addresses
//!   registry::CommandTree   owned command forest
//!   dispatch::Interpreter   runs lines, including the `help` walk
//!   context::CmdInfo        reference-counted execution context
//!   iter::for_each_*        nested, filtered object walkers over an `Inventory`
//!   handlers::register_*    ready-made address commands

pub mod context;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod iter;
pub mod objstr;
pub mod output;
pub mod registry;
pub mod tokenize;

pub use context::{CmdInfo, Hold, Invocation};
pub use dispatch::Interpreter;
pub use error::{ErrorKind, LangError};
pub use iter::Inventory;
pub use objstr::ObjAddr;
pub use output::Output;
pub use registry::{CommandTree, Handler, HandlerData, NodeId};
