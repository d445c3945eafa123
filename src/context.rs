/*!
Per-line shared state and the per-invocation execution context.

`Invocation` lives for one input line. It owns the output sink and the
first-error slot, and it delivers the sink's `done` callback exactly once.

`CmdInfo` is what a leaf handler receives. Cloning it is cheap (an `Arc`);
cloning alone does not keep the line open. The use count does:

  - the dispatcher creates the context with a count of 1 and releases it
    once after the handler returns;
  - a handler that keeps working after it returns calls `retain` (or takes a
    `Hold` guard) before returning, and its continuations release later;
  - the release that brings the count to 0 fires `done`.

Storage (arguments, handler data) is kept alive by the `Arc` for as long as
any clone exists, so a continuation never sees freed arguments.
*/

use std::any::Any;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::error::LangError;
use crate::output::{Output, fmt_bool, fmt_hex, fmt_int};
use crate::registry::HandlerData;

/* ---- Shared invocation state ---- */

struct SinkState {
    sink: Box<dyn Output>,
    depth: usize,
}

/// State shared by everything processing one line.
pub struct Invocation {
    sink: Mutex<SinkState>,
    error: OnceLock<LangError>,
    completed: AtomicBool,
}

impl Invocation {
    pub fn new(sink: Box<dyn Output>) -> Arc<Self> {
        Arc::new(Self {
            sink: Mutex::new(SinkState { sink, depth: 0 }),
            error: OnceLock::new(),
            completed: AtomicBool::new(false),
        })
    }

    fn sink(&self) -> MutexGuard<'_, SinkState> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `err` unless an earlier error is already recorded.
    /// Returns whether this call recorded it.
    pub fn fail(&self, err: LangError) -> bool {
        match self.error.set(err) {
            Ok(()) => true,
            Err(later) => {
                tracing::trace!(error = %later, "dropping later error");
                false
            }
        }
    }

    pub fn error(&self) -> Option<&LangError> {
        self.error.get()
    }

    pub fn has_error(&self) -> bool {
        self.error.get().is_some()
    }

    pub fn out(&self, name: &str, value: Option<&str>) -> Result<(), LangError> {
        let result = self.sink().sink.out(name, value);
        if let Err(e) = &result {
            self.fail(e.clone());
        }
        result
    }

    pub fn down(&self) {
        let mut state = self.sink();
        state.depth += 1;
        state.sink.down();
    }

    pub fn up(&self) {
        let mut state = self.sink();
        if state.depth == 0 {
            tracing::warn!("unbalanced up() ignored");
            return;
        }
        state.depth -= 1;
        state.sink.up();
    }

    /// Deliver `done` to the sink. Only the first call has any effect.
    pub fn complete(&self) {
        if self.completed.swap(true, Ordering::AcqRel) {
            tracing::warn!("line already completed");
            return;
        }
        let mut state = self.sink();
        while state.depth > 0 {
            tracing::warn!(depth = state.depth, "closing scope left open at completion");
            state.depth -= 1;
            state.sink.up();
        }
        let error = self.error.get();
        tracing::debug!(error = ?error, "line complete");
        state.sink.done(error);
    }

    pub fn is_complete(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }
}

/* ---- Execution context ---- */

struct Inner {
    invocation: Arc<Invocation>,
    command: String,
    argv: Vec<String>,
    curr_arg: AtomicUsize,
    handler_data: Option<HandlerData>,
    usecount: AtomicUsize,
}

/// Execution context handed to leaf handlers.
#[derive(Clone)]
pub struct CmdInfo {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CmdInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmdInfo")
            .field("command", &self.inner.command)
            .field("argv", &self.inner.argv)
            .field("curr_arg", &self.curr_arg())
            .field("usecount", &self.usecount())
            .finish()
    }
}

impl CmdInfo {
    /// New context with a use count of 1, owned by the caller.
    pub fn new(
        invocation: Arc<Invocation>,
        command: impl Into<String>,
        argv: Vec<String>,
        curr_arg: usize,
        handler_data: Option<HandlerData>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                invocation,
                command: command.into(),
                argv,
                curr_arg: AtomicUsize::new(curr_arg),
                handler_data,
                usecount: AtomicUsize::new(1),
            }),
        }
    }

    /// Name of the leaf command being run.
    pub fn command(&self) -> &str {
        &self.inner.command
    }

    pub fn invocation(&self) -> &Arc<Invocation> {
        &self.inner.invocation
    }

    /* ---- Arguments ---- */

    /// Every token of the line, command words included.
    pub fn argv(&self) -> &[String] {
        &self.inner.argv
    }

    pub fn argc(&self) -> usize {
        self.inner.argv.len()
    }

    /// Index of the first argument not yet consumed.
    pub fn curr_arg(&self) -> usize {
        self.inner.curr_arg.load(Ordering::Acquire)
    }

    pub fn set_curr_arg(&self, idx: usize) {
        self.inner
            .curr_arg
            .store(idx.min(self.argc()), Ordering::Release);
    }

    /// Arguments not yet consumed.
    pub fn remaining(&self) -> &[String] {
        &self.inner.argv[self.curr_arg().min(self.argc())..]
    }

    /// Consume and return the next argument.
    pub fn next_arg(&self) -> Option<&str> {
        let argc = self.argc();
        let idx = self
            .inner
            .curr_arg
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| {
                (i < argc).then_some(i + 1)
            })
            .ok()?;
        Some(&self.inner.argv[idx])
    }

    /// Typed view of the matched node's handler data.
    pub fn handler_data<T: Any>(&self) -> Option<&T> {
        self.inner.handler_data.as_deref()?.downcast_ref::<T>()
    }

    /* ---- Errors ---- */

    pub fn fail(&self, err: LangError) {
        self.inner.invocation.fail(err);
    }

    pub fn has_error(&self) -> bool {
        self.inner.invocation.has_error()
    }

    pub fn error(&self) -> Option<&LangError> {
        self.inner.invocation.error()
    }

    /* ---- Output ---- */

    /// Emit a pair. A refused write is recorded as the line's error.
    pub fn out(&self, name: &str, value: Option<&str>) {
        let _ = self.inner.invocation.out(name, value);
    }

    pub fn out_str(&self, name: &str, value: &str) {
        self.out(name, Some(value));
    }

    pub fn out_int(&self, name: &str, value: i64) {
        self.out(name, Some(&fmt_int(value)));
    }

    pub fn out_hex(&self, name: &str, value: u64) {
        self.out(name, Some(&fmt_hex(value)));
    }

    pub fn out_bool(&self, name: &str, value: bool) {
        self.out(name, Some(fmt_bool(value)));
    }

    pub fn down(&self) {
        self.inner.invocation.down();
    }

    pub fn up(&self) {
        self.inner.invocation.up();
    }

    /* ---- Lifecycle ---- */

    pub fn usecount(&self) -> usize {
        self.inner.usecount.load(Ordering::Acquire)
    }

    /// Keep the line open past the handler's return.
    pub fn retain(&self) {
        self.inner.usecount.fetch_add(1, Ordering::AcqRel);
    }

    /// Drop one use; the last one completes the line.
    pub fn release(&self) {
        let prev = self
            .inner
            .usecount
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match prev {
            Ok(1) => self.inner.invocation.complete(),
            Ok(_) => {}
            Err(_) => tracing::warn!(command = %self.command(), "release on a finished context"),
        }
    }

    /// `retain` now, `release` when the guard drops.
    pub fn hold(&self) -> Hold {
        self.retain();
        Hold { info: self.clone() }
    }
}

/// Outstanding use of a [`CmdInfo`]; releases on drop.
#[derive(Debug)]
pub struct Hold {
    info: CmdInfo,
}

impl Deref for Hold {
    type Target = CmdInfo;

    fn deref(&self) -> &CmdInfo {
        &self.info
    }
}

impl Drop for Hold {
    fn drop(&mut self) {
        self.info.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::{Event, Recorder};

    fn ctx(rec: &Recorder, argv: &[&str], curr: usize) -> CmdInfo {
        let inv = Invocation::new(Box::new(rec.clone()));
        CmdInfo::new(
            inv,
            "test",
            argv.iter().map(|s| s.to_string()).collect(),
            curr,
            None,
        )
    }

    #[test]
    fn retain_then_two_releases_completes_once() {
        let rec = Recorder::default();
        let info = ctx(&rec, &[], 0);
        info.retain();
        info.release();
        assert_eq!(rec.done_count(), 0, "done must wait for the last release");
        info.release();
        assert_eq!(rec.done_count(), 1);
        info.release();
        assert_eq!(rec.done_count(), 1, "extra release is ignored");
    }

    #[test]
    fn hold_guard_releases_on_drop_from_another_thread() {
        let rec = Recorder::default();
        let info = ctx(&rec, &[], 0);
        let hold = info.hold();
        info.release();
        assert_eq!(rec.done_count(), 0);
        std::thread::spawn(move || {
            hold.out_int("late", 3);
            drop(hold);
        })
        .join()
        .unwrap();
        assert_eq!(
            rec.events(),
            vec![Event::Out("late".into(), Some("3".into())), Event::Done(None)]
        );
    }

    #[test]
    fn first_error_wins() {
        let rec = Recorder::default();
        let info = ctx(&rec, &[], 0);
        info.fail(LangError::invalid("domain"));
        info.fail(LangError::CommandNotFound);
        info.release();
        assert_eq!(rec.outcome(), Some(Some(LangError::invalid("domain"))));
    }

    #[test]
    fn cursor_helpers() {
        let rec = Recorder::default();
        let info = ctx(&rec, &["sensor", "list", "a", "b"], 2);
        assert_eq!(info.remaining(), ["a", "b"]);
        assert_eq!(info.next_arg(), Some("a"));
        assert_eq!(info.next_arg(), Some("b"));
        assert_eq!(info.next_arg(), None);
        assert_eq!(info.curr_arg(), 4);
        assert!(info.remaining().is_empty());
        info.set_curr_arg(99);
        assert_eq!(info.curr_arg(), 4);
    }

    #[test]
    fn completion_closes_dangling_scopes() {
        let rec = Recorder::default();
        let info = ctx(&rec, &[], 0);
        info.down();
        info.up();
        info.up();
        info.down();
        info.release();
        assert_eq!(
            rec.events(),
            vec![Event::Down, Event::Up, Event::Down, Event::Up, Event::Done(None)]
        );
    }

    #[test]
    fn refused_write_becomes_line_error() {
        let rec = Recorder::failing_after(0);
        let info = ctx(&rec, &[], 0);
        info.out_str("x", "y");
        assert!(info.has_error());
        info.release();
        assert!(matches!(rec.outcome(), Some(Some(LangError::Output(_)))));
    }

    #[test]
    fn handler_data_downcasts() {
        let rec = Recorder::default();
        let inv = Invocation::new(Box::new(rec.clone()));
        let data: HandlerData = Arc::new(42u32);
        let info = CmdInfo::new(inv, "x", Vec::new(), 0, Some(data));
        assert_eq!(info.handler_data::<u32>(), Some(&42));
        assert_eq!(info.handler_data::<String>(), None);
    }
}
