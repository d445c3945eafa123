/*!
Line-driving loop around the interpreter.

Sources of lines:
  - `-e LINE` arguments (in order)
  - a script file (one command per line)
  - stdin, interactively, with a `> ` prompt when attached to a terminal

Blank lines and lines starting with `#` are skipped. Each line runs to
completion (the sink's `done` fires) before the next one starts; a line that
does not complete within the configured timeout is reported and abandoned.
An abandoned line's sink is closed: late writes from its outstanding work are
refused (which records an error and stops well-behaved handlers) and never
reach the terminal.
*/

pub mod commands;
pub mod inventory;
pub mod sink;

use std::io::IsTerminal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use cmdlang::{Interpreter, LangError, Output};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::oneshot;

use inventory::Fixture;
use sink::{JsonSink, Outcome, Role, StyleOptions, TextSink, color};

/// Shell configuration assembled from the command line.
#[derive(Debug, Clone)]
pub struct ShellOptions {
    pub json: bool,
    pub timeout: Duration,
    pub refresh_delay: Duration,
    pub style: StyleOptions,
}

/// Running totals over all lines handled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub lines: usize,
    pub failed: usize,
}

pub struct Shell {
    interp: Arc<Interpreter>,
    opts: ShellOptions,
}

impl Shell {
    /// Build the command tree over `inventory`; must run inside a Tokio runtime.
    pub fn new(inventory: Arc<Fixture>, opts: ShellOptions) -> Result<Self> {
        let tree = commands::build(
            inventory,
            tokio::runtime::Handle::current(),
            opts.refresh_delay,
        )
        .context("failed to register commands")?;
        Ok(Self {
            interp: Arc::new(Interpreter::new(tree)),
            opts,
        })
    }

    fn sink(&self, done: oneshot::Sender<Outcome>) -> Box<dyn Output> {
        if self.opts.json {
            Box::new(JsonSink::stdout(done))
        } else {
            Box::new(TextSink::stdio(self.opts.style, done))
        }
    }

    /// Run one line with an explicit sink and wait for it to complete.
    pub async fn run_with(
        &self,
        line: &str,
        sink: impl FnOnce(oneshot::Sender<Outcome>) -> Box<dyn Output>,
    ) -> Outcome {
        let (tx, rx) = oneshot::channel();
        let closed = Arc::new(AtomicBool::new(false));
        let gated = Gate {
            inner: sink(tx),
            closed: Arc::clone(&closed),
        };
        self.interp.handle(line, Box::new(gated));
        match tokio::time::timeout(self.opts.timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Some(LangError::Output("sink dropped before completion".into())),
            Err(_) => {
                closed.store(true, Ordering::Release);
                tracing::warn!(line = %line, "line did not complete in time");
                Some(LangError::operation(110, "Timed out waiting for completion"))
            }
        }
    }

    pub async fn run_line(&self, line: &str) -> Outcome {
        self.run_with(line, |tx| self.sink(tx)).await
    }

    /// Run lines in order, skipping blanks and `#` comments.
    pub async fn run_lines<I, S>(&self, lines: I) -> Summary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut summary = Summary::default();
        for line in lines {
            let line = line.as_ref();
            if is_skippable(line) {
                continue;
            }
            summary.lines += 1;
            if self.run_line(line).await.is_some() {
                summary.failed += 1;
            }
        }
        summary
    }

    pub async fn run_script(&self, path: &std::path::Path) -> Result<Summary> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read script: {}", path.display()))?;
        Ok(self.run_lines(raw.lines()).await)
    }

    /// Read stdin until EOF, prompting when interactive.
    pub async fn run_stdin(&self) -> Result<Summary> {
        let interactive = std::io::stdin().is_terminal();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        let prompt = color(Role::Dim, "> ", &self.opts.style);
        let mut summary = Summary::default();
        loop {
            if interactive {
                stdout.write_all(prompt.as_bytes()).await?;
                stdout.flush().await?;
            }
            let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
                break;
            };
            if is_skippable(&line) {
                continue;
            }
            summary.lines += 1;
            if self.run_line(&line).await.is_some() {
                summary.failed += 1;
            }
        }
        Ok(summary)
    }
}

/// Sink wrapper that goes silent once its line is abandoned.
struct Gate {
    inner: Box<dyn Output>,
    closed: Arc<AtomicBool>,
}

impl Gate {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Output for Gate {
    fn out(&mut self, name: &str, value: Option<&str>) -> Result<(), LangError> {
        if self.is_closed() {
            return Err(LangError::Output("line abandoned after timeout".into()));
        }
        self.inner.out(name, value)
    }

    fn down(&mut self) {
        if !self.is_closed() {
            self.inner.down();
        }
    }

    fn up(&mut self) {
        if !self.is_closed() {
            self.inner.up();
        }
    }

    fn done(&mut self, error: Option<&LangError>) {
        if self.is_closed() {
            tracing::debug!(error = ?error, "abandoned line finished");
            return;
        }
        self.inner.done(error);
    }
}

fn is_skippable(line: &str) -> bool {
    let t = line.trim_start();
    t.is_empty() || t.starts_with('#')
}
