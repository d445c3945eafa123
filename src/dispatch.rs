/*!
Line dispatcher.

`Interpreter::handle` runs one line:

  1. tokenize (syntax errors end the line here)
  2. empty line          -> "No command"
     first token `help`  -> help walk
     anything else       -> normal walk from the top level
  3. normal walk: match each token against the current level's siblings;
     branches descend, a leaf is invoked once with a fresh `CmdInfo` whose
     cursor sits just past the leaf's own name
  4. the dispatcher releases its use of the context; the sink's `done`
     fires when the last use is released (possibly much later)

Errors at any step are recorded on the line's `Invocation`; `done` always
fires exactly once.
*/

use std::sync::Arc;

use crate::context::{CmdInfo, Invocation};
use crate::error::{LangError, Result};
use crate::output::Output;
use crate::registry::{CommandKind, CommandTree, NodeId};
use crate::tokenize::tokenize;

/// Name of the built-in help walk.
pub const HELP: &str = "help";

/// Owns a command tree and runs lines against it.
#[derive(Debug, Default)]
pub struct Interpreter {
    tree: CommandTree,
}

impl Interpreter {
    pub fn new(tree: CommandTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut CommandTree {
        &mut self.tree
    }

    /// Run one line, reporting everything through `sink`.
    ///
    /// Returns once the handler (if any) has returned; `sink.done` may fire
    /// later if the handler retained its context.
    pub fn handle(&self, line: &str, sink: Box<dyn Output>) -> Arc<Invocation> {
        let invocation = Invocation::new(sink);
        match self.run(line, &invocation) {
            Ok(Some(info)) => info.release(),
            Ok(None) => invocation.complete(),
            Err(e) => {
                tracing::debug!(line = %line, error = %e, "dispatch failed");
                invocation.fail(e);
                invocation.complete();
            }
        }
        invocation
    }

    /// Everything up to and including the handler call. `Some` carries the
    /// dispatcher's own use of the context.
    fn run(&self, line: &str, invocation: &Arc<Invocation>) -> Result<Option<CmdInfo>> {
        let argv = tokenize(line)?;
        let Some(first) = argv.first() else {
            return Err(LangError::NoCommand);
        };
        if first == HELP {
            self.help(invocation, &argv[1..])?;
            return Ok(None);
        }

        let (id, curr_arg) = self.resolve(&argv)?;
        let node = self.tree.get(id).ok_or(LangError::CommandNotFound)?;
        let CommandKind::Leaf(handler) = node.kind() else {
            return Err(LangError::MissingCommand);
        };

        tracing::debug!(command = %node.name(), curr_arg, argc = argv.len(), "invoke");
        let info = CmdInfo::new(
            Arc::clone(invocation),
            node.name(),
            argv,
            curr_arg,
            node.data().cloned(),
        );
        handler(&info);
        Ok(Some(info))
    }

    /// Walk tokens down the tree to a leaf. Returns the leaf and the index of
    /// the first token after it.
    pub fn resolve(&self, argv: &[String]) -> Result<(NodeId, usize)> {
        if argv.is_empty() {
            return Err(LangError::NoCommand);
        }
        let mut level = self.tree.roots();
        let mut curr = 0;
        loop {
            let token = argv.get(curr).ok_or(LangError::MissingCommand)?;
            let id = self
                .tree
                .lookup(level, token)
                .ok_or(LangError::CommandNotFound)?;
            curr += 1;
            match self.tree.get(id).map(|n| n.kind()) {
                Some(CommandKind::Branch(children)) => level = children,
                Some(CommandKind::Leaf(_)) => return Ok((id, curr)),
                None => return Err(LangError::CommandNotFound),
            }
        }
    }

    /// Descend by `path`, then list the reached level: the matched command's
    /// own help (or a bare `help` heading at the top), then one nested pair per
    /// command at that level. A refused write stops the listing.
    fn help(&self, invocation: &Invocation, path: &[String]) -> Result<()> {
        let mut level = self.tree.roots();
        let mut parent = None;
        for token in path {
            if level.is_empty() {
                return Err(LangError::CommandNotFound);
            }
            let id = self
                .tree
                .lookup(level, token)
                .ok_or(LangError::CommandNotFound)?;
            parent = self.tree.get(id);
            level = self.tree.level(Some(id));
        }

        let heading = match parent {
            Some(cmd) => invocation.out(cmd.name(), cmd.help()),
            None => invocation.out(HELP, None),
        };
        if heading.is_err() {
            return Ok(());
        }

        invocation.down();
        for id in level {
            let Some(cmd) = self.tree.get(*id) else {
                continue;
            };
            if invocation.out(cmd.name(), cmd.help()).is_err() {
                break;
            }
        }
        invocation.up();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::output::testing::{Event, Recorder};

    fn interp() -> (Interpreter, Arc<Mutex<Vec<(Vec<String>, usize)>>>) {
        let seen: Arc<Mutex<Vec<(Vec<String>, usize)>>> = Arc::default();
        let mut tree = CommandTree::new();
        let domain = tree.branch(None, "domain", "domain commands").unwrap();
        let s = Arc::clone(&seen);
        tree.leaf(Some(domain), "list", "list domains", move |info| {
            s.lock()
                .unwrap()
                .push((info.argv().to_vec(), info.curr_arg()));
        })
        .unwrap();
        tree.leaf(Some(domain), "info", "domain info", |info| {
            info.out_str("Domain", info.next_arg().unwrap_or("?"));
        })
        .unwrap();
        tree.branch(None, "entity", "entity commands").unwrap();
        (Interpreter::new(tree), seen)
    }

    fn run(i: &Interpreter, line: &str) -> Recorder {
        let rec = Recorder::default();
        i.handle(line, Box::new(rec.clone()));
        rec
    }

    #[test]
    fn leaf_gets_cursor_past_command_words() {
        let (i, seen) = interp();
        let rec = run(&i, "domain list extra");
        assert_eq!(rec.outcome(), Some(None));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, ["domain", "list", "extra"]);
        assert_eq!(seen[0].1, 2);
    }

    #[test]
    fn handler_output_then_done() {
        let (i, _) = interp();
        let rec = run(&i, "domain info \"lab one\"");
        assert_eq!(
            rec.events(),
            vec![
                Event::Out("Domain".into(), Some("lab one".into())),
                Event::Done(None)
            ]
        );
    }

    #[test]
    fn lookup_errors() {
        let (i, _) = interp();
        assert_eq!(run(&i, "").outcome(), Some(Some(LangError::NoCommand)));
        assert_eq!(run(&i, "   ").outcome(), Some(Some(LangError::NoCommand)));
        assert_eq!(
            run(&i, "bogus").outcome(),
            Some(Some(LangError::CommandNotFound))
        );
        assert_eq!(
            run(&i, "domain").outcome(),
            Some(Some(LangError::MissingCommand))
        );
        assert_eq!(
            run(&i, "domain nope").outcome(),
            Some(Some(LangError::CommandNotFound))
        );
        assert_eq!(
            run(&i, "entity").outcome(),
            Some(Some(LangError::MissingCommand))
        );
    }

    #[test]
    fn syntax_error_completes_once() {
        let (i, seen) = interp();
        let rec = run(&i, "domain list \\");
        assert_eq!(rec.events(), vec![Event::Done(Some(LangError::InvalidString))]);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn help_at_top_level() {
        let (i, _) = interp();
        let rec = run(&i, "help");
        assert_eq!(
            rec.events(),
            vec![
                Event::Out("help".into(), None),
                Event::Down,
                Event::Out("domain".into(), Some("domain commands".into())),
                Event::Out("entity".into(), Some("entity commands".into())),
                Event::Up,
                Event::Done(None),
            ]
        );
    }

    #[test]
    fn help_for_branch_lists_children() {
        let (i, _) = interp();
        let rec = run(&i, "help domain");
        assert_eq!(
            rec.pairs(),
            vec![
                ("domain".into(), Some("domain commands".into())),
                ("list".into(), Some("list domains".into())),
                ("info".into(), Some("domain info".into())),
            ]
        );
        assert_eq!(rec.outcome(), Some(None));
    }

    #[test]
    fn help_for_leaf_and_errors() {
        let (i, _) = interp();
        let rec = run(&i, "help domain list");
        assert_eq!(
            rec.events(),
            vec![
                Event::Out("list".into(), Some("list domains".into())),
                Event::Down,
                Event::Up,
                Event::Done(None),
            ]
        );
        assert_eq!(
            run(&i, "help domain list more").outcome(),
            Some(Some(LangError::CommandNotFound))
        );
        assert_eq!(
            run(&i, "help nothing").outcome(),
            Some(Some(LangError::CommandNotFound))
        );
    }

    #[test]
    fn help_stops_when_sink_refuses() {
        let (i, _) = interp();
        let rec = Recorder::failing_after(2);
        i.handle("help", Box::new(rec.clone()));
        assert_eq!(
            rec.events(),
            vec![
                Event::Out("help".into(), None),
                Event::Down,
                Event::Out("domain".into(), Some("domain commands".into())),
                Event::Up,
                Event::Done(Some(LangError::Output("sink closed".into()))),
            ]
        );
    }

    #[test]
    fn retained_context_completes_after_last_release() {
        let parked: Arc<Mutex<Option<CmdInfo>>> = Arc::default();
        let mut tree = CommandTree::new();
        let p = Arc::clone(&parked);
        tree.leaf(None, "later", "", move |info| {
            info.retain();
            *p.lock().unwrap() = Some(info.clone());
        })
        .unwrap();
        let i = Interpreter::new(tree);

        let rec = run(&i, "later");
        assert_eq!(rec.done_count(), 0, "dispatcher release alone must not complete");

        let info = parked.lock().unwrap().take().unwrap();
        info.out_str("result", "ok");
        info.release();
        assert_eq!(
            rec.events(),
            vec![Event::Out("result".into(), Some("ok".into())), Event::Done(None)]
        );
    }
}
