/*!
Output protocol.

The engine never formats anything itself. Everything a command produces goes
through an [`Output`] sink as a stream of events:

  out(name, value)   one name/value pair (value may be absent, e.g. headings)
  down() / up()      open / close a nesting scope; always balanced
  done(error)        exactly once per line, when the last holder of the
                     execution context lets go

Rendering (plain text, JSON, XML, a remote wire format) is the sink's job.
*/

use crate::error::LangError;

/// Sink for everything a line produces.
///
/// `out` may refuse a write; the refusal is recorded as the line's error and
/// stops help listings early. `done` receives the first error recorded for
/// the line, or `None` on success.
pub trait Output: Send {
    fn out(&mut self, name: &str, value: Option<&str>) -> Result<(), LangError>;
    fn down(&mut self);
    fn up(&mut self);
    fn done(&mut self, error: Option<&LangError>);
}

/// Decimal rendering used by `out_int`.
pub fn fmt_int(value: i64) -> String {
    value.to_string()
}

/// `0x`-prefixed lowercase hex rendering used by `out_hex`.
pub fn fmt_hex(value: u64) -> String {
    format!("{value:#x}")
}

pub fn fmt_bool(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Recording sink for unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::Output;
    use crate::error::LangError;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Event {
        Out(String, Option<String>),
        Down,
        Up,
        Done(Option<LangError>),
    }

    /// Shares its event log through an `Arc` so tests can inspect it after
    /// the sink has been moved into an invocation.
    #[derive(Clone, Default)]
    pub struct Recorder {
        pub events: Arc<Mutex<Vec<Event>>>,
        /// Refuse every `out` once this many have succeeded.
        pub fail_after: Option<usize>,
        outs: usize,
    }

    impl Recorder {
        pub fn failing_after(n: usize) -> Self {
            Self {
                fail_after: Some(n),
                ..Self::default()
            }
        }

        pub fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        pub fn done_count(&self) -> usize {
            self.events()
                .iter()
                .filter(|e| matches!(e, Event::Done(_)))
                .count()
        }

        pub fn outcome(&self) -> Option<Option<LangError>> {
            self.events().into_iter().find_map(|e| match e {
                Event::Done(err) => Some(err),
                _ => None,
            })
        }

        /// Names emitted with `out`, in order.
        pub fn names(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Out(n, _) => Some(n),
                    _ => None,
                })
                .collect()
        }

        pub fn pairs(&self) -> Vec<(String, Option<String>)> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Out(n, v) => Some((n, v)),
                    _ => None,
                })
                .collect()
        }
    }

    impl Output for Recorder {
        fn out(&mut self, name: &str, value: Option<&str>) -> Result<(), LangError> {
            if self.fail_after.is_some_and(|n| self.outs >= n) {
                return Err(LangError::Output("sink closed".into()));
            }
            self.outs += 1;
            self.events
                .lock()
                .unwrap()
                .push(Event::Out(name.to_string(), value.map(str::to_string)));
            Ok(())
        }

        fn down(&mut self) {
            self.events.lock().unwrap().push(Event::Down);
        }

        fn up(&mut self) {
            self.events.lock().unwrap().push(Event::Up);
        }

        fn done(&mut self, error: Option<&LangError>) {
            self.events.lock().unwrap().push(Event::Done(error.cloned()));
        }
    }
}
