/*!
Error types shared by every stage of line processing.

One `LangError` value describes the first failure seen while handling a
line: tokenizing, address parsing, the tree walk, nested iteration, or a
handler's own operation. The invocation stores it once (later errors are
dropped) and hands it to the output sink's completion callback.

Taxonomy (see `ErrorKind`):
  - Syntax        bad quoting / escaping, malformed address, too many tokens
  - Lookup        unknown command, missing command, empty line
  - Registration  duplicate sibling name, bad parent (startup only)
  - Resource      allocation failure (kept for handlers that report it)
  - Operation     anything a leaf handler reports for its own work
*/

use thiserror::Error;

/// Coarse classification of a [`LangError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    Lookup,
    Registration,
    Resource,
    Operation,
}

/// Every failure the engine (or a handler running inside it) can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LangError {
    /// Backslash with nothing after it.
    #[error("Invalid string")]
    InvalidString,

    /// More than `tokenize::MAX_ARGS` tokens on one line.
    #[error("Too many arguments")]
    TooManyArguments,

    /// The line held no tokens at all.
    #[error("No command")]
    NoCommand,

    /// Tokens ran out while still on a branch node.
    #[error("Missing command")]
    MissingCommand,

    /// A token matched no sibling at the current level.
    #[error("Command not found")]
    CommandNotFound,

    /// Registration under a parent that already holds a sibling with this name.
    #[error("duplicate command name '{0}'")]
    DuplicateName(String),

    /// Registration under a node that owns a handler.
    #[error("command '{0}' has a handler and cannot own subcommands")]
    ParentHasHandler(String),

    /// Registration under a node id this tree never handed out.
    #[error("unknown parent node")]
    UnknownParent,

    /// Malformed or unusable object address for the given kind ("domain", "entity", ...).
    #[error("Invalid {kind}")]
    InvalidObject { kind: &'static str },

    #[error("Invalid connection number")]
    InvalidConnectionNumber,

    /// Leaf handler invoked with handler data of an unexpected type.
    #[error("handler data missing or of the wrong type")]
    MissingHandlerData,

    #[error("Out of memory")]
    OutOfMemory,

    /// The output sink refused a write.
    #[error("output failed: {0}")]
    Output(String),

    /// Failure reported by a handler for its own operation.
    #[error("{message}")]
    Operation { code: i32, message: String },
}

impl LangError {
    /// Convenience constructor for handler-reported failures.
    pub fn operation(code: i32, message: impl Into<String>) -> Self {
        LangError::Operation {
            code,
            message: message.into(),
        }
    }

    pub fn invalid(kind: &'static str) -> Self {
        LangError::InvalidObject { kind }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LangError::InvalidString
            | LangError::TooManyArguments
            | LangError::InvalidObject { .. }
            | LangError::InvalidConnectionNumber => ErrorKind::Syntax,
            LangError::NoCommand | LangError::MissingCommand | LangError::CommandNotFound => {
                ErrorKind::Lookup
            }
            LangError::DuplicateName(_)
            | LangError::ParentHasHandler(_)
            | LangError::UnknownParent => ErrorKind::Registration,
            LangError::OutOfMemory => ErrorKind::Resource,
            LangError::MissingHandlerData | LangError::Output(_) | LangError::Operation { .. } => {
                ErrorKind::Operation
            }
        }
    }

    /// errno-style code for drivers that report numeric status on the wire.
    pub fn code(&self) -> i32 {
        const E2BIG: i32 = 7;
        const ENOMEM: i32 = 12;
        const EEXIST: i32 = 17;
        const EINVAL: i32 = 22;
        const ENOSYS: i32 = 38;
        const ENOMSG: i32 = 42;
        const EIO: i32 = 5;

        match self {
            LangError::InvalidString
            | LangError::InvalidObject { .. }
            | LangError::InvalidConnectionNumber
            | LangError::ParentHasHandler(_)
            | LangError::UnknownParent
            | LangError::MissingHandlerData => EINVAL,
            LangError::TooManyArguments => E2BIG,
            LangError::NoCommand | LangError::MissingCommand => ENOMSG,
            LangError::CommandNotFound => ENOSYS,
            LangError::DuplicateName(_) => EEXIST,
            LangError::OutOfMemory => ENOMEM,
            LangError::Output(_) => EIO,
            LangError::Operation { code, .. } => *code,
        }
    }
}

pub type Result<T, E = LangError> = std::result::Result<T, E>;
