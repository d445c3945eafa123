/*!
Command registry.

A forest of named commands. Each command is either a leaf (it owns a handler)
or a branch (it owns an ordered list of subcommands). The tree is an arena:
nodes live in one `Vec` and refer to each other by `NodeId`, so dropping the
tree (or calling `clear`) frees everything at once.

Sibling order is registration order and is what `help` lists.
*/

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::context::CmdInfo;
use crate::error::{LangError, Result};

/// Leaf command callback.
pub type Handler = Arc<dyn Fn(&CmdInfo) + Send + Sync>;

/// Opaque per-command payload handed to the handler through `CmdInfo::handler_data`.
pub type HandlerData = Arc<dyn Any + Send + Sync>;

/// Index of a command inside its [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

pub enum CommandKind {
    Leaf(Handler),
    Branch(Vec<NodeId>),
}

pub struct Command {
    name: String,
    help: Option<String>,
    data: Option<HandlerData>,
    kind: CommandKind,
}

impl Command {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn data(&self) -> Option<&HandlerData> {
        self.data.as_ref()
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    pub fn handler(&self) -> Option<&Handler> {
        match &self.kind {
            CommandKind::Leaf(h) => Some(h),
            CommandKind::Branch(_) => None,
        }
    }

    /// Subcommands; empty for leaves.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            CommandKind::Leaf(_) => &[],
            CommandKind::Branch(c) => c,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, CommandKind::Leaf(_))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("help", &self.help)
            .field("leaf", &self.is_leaf())
            .field("children", &self.children())
            .finish()
    }
}

/// Owned command forest.
#[derive(Default, Debug)]
pub struct CommandTree {
    nodes: Vec<Command>,
    roots: Vec<NodeId>,
}

impl CommandTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Command> {
        self.nodes.get(id.0)
    }

    /// Top-level commands in registration order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of `parent`, or the top level for `None`.
    pub fn level(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            None => &self.roots,
            Some(id) => self.get(id).map(Command::children).unwrap_or(&[]),
        }
    }

    /// Sibling named `name` within `level`.
    pub fn lookup(&self, level: &[NodeId], name: &str) -> Option<NodeId> {
        level
            .iter()
            .copied()
            .find(|id| self.nodes[id.0].name == name)
    }

    /// Resolve a path of names from the top level, e.g. `["entity", "hs"]`.
    pub fn find(&self, path: &[&str]) -> Option<NodeId> {
        let mut parent = None;
        for name in path {
            parent = Some(self.lookup(self.level(parent), name)?);
        }
        parent
    }

    /// Add a command under `parent` (or at the top level).
    ///
    /// With a handler the command is a leaf; without one it is a branch that
    /// later registrations can hang subcommands on. The parent must not be a
    /// leaf, and no sibling may share the name. Nothing changes on error.
    pub fn register(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        help: Option<&str>,
        handler: Option<Handler>,
        data: Option<HandlerData>,
    ) -> Result<NodeId> {
        let name = name.into();
        if let Some(p) = parent {
            let node = self.get(p).ok_or(LangError::UnknownParent)?;
            if node.is_leaf() {
                return Err(LangError::ParentHasHandler(node.name.clone()));
            }
        }
        if self.lookup(self.level(parent), &name).is_some() {
            tracing::debug!(name = %name, "duplicate command registration rejected");
            return Err(LangError::DuplicateName(name));
        }

        let id = NodeId(self.nodes.len());
        let kind = match handler {
            Some(h) => CommandKind::Leaf(h),
            None => CommandKind::Branch(Vec::new()),
        };
        tracing::trace!(name = %name, leaf = matches!(kind, CommandKind::Leaf(_)), "register command");
        self.nodes.push(Command {
            name,
            help: help.map(str::to_string),
            data,
            kind,
        });
        match parent {
            None => self.roots.push(id),
            Some(p) => {
                if let CommandKind::Branch(children) = &mut self.nodes[p.0].kind {
                    children.push(id);
                }
            }
        }
        Ok(id)
    }

    /// Register a branch command.
    pub fn branch(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        help: &str,
    ) -> Result<NodeId> {
        self.register(parent, name, Some(help), None, None)
    }

    /// Register a leaf command without handler data.
    pub fn leaf<F>(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        help: &str,
        handler: F,
    ) -> Result<NodeId>
    where
        F: Fn(&CmdInfo) + Send + Sync + 'static,
    {
        self.register(parent, name, Some(help), Some(Arc::new(handler)), None)
    }

    /// Drop every command.
    pub fn clear(&mut self) {
        self.roots.clear();
        self.nodes.clear();
    }
}
