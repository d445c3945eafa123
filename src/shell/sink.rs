/*!
Output sinks for the shell.

Two renderings of the engine's event stream:

  TextSink   indented `Name: value` lines, names colored unless NO_COLOR is set
  JsonSink   one JSON document per line, written at completion:

    { "status": "ok", "results": [ { "name": "Domain", "value": "lab",
                                     "children": [ ... ] } ] }
    { "status": "error", "error": "Command not found", "code": 38,
      "results": [ ... ] }

Both forward the line's outcome to the shell loop through a oneshot channel
once `done` fires.
*/

use std::io::Write;

use cmdlang::{LangError, Output};
use serde::Serialize;
use tokio::sync::oneshot;

/// Line outcome delivered to the shell loop.
pub type Outcome = Option<LangError>;

/* -------------------------------------------------------------------------- */
/* Style                                                                       */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy)]
pub struct StyleOptions {
    pub use_color: bool,
    pub indent: usize,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self::detect()
    }
}

impl StyleOptions {
    pub fn detect() -> Self {
        StyleOptions {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            indent: 2,
        }
    }

    pub fn plain() -> Self {
        StyleOptions {
            use_color: false,
            indent: 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Error,
    Dim,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45", // cyan-ish
        Role::Error => "38;5;196",  // red
        Role::Dim => "2",           // faint
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

/* -------------------------------------------------------------------------- */
/* Text                                                                        */
/* -------------------------------------------------------------------------- */

pub struct TextSink {
    style: StyleOptions,
    depth: usize,
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    done: Option<oneshot::Sender<Outcome>>,
}

impl TextSink {
    pub fn new(
        style: StyleOptions,
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
        done: oneshot::Sender<Outcome>,
    ) -> Self {
        Self {
            style,
            depth: 0,
            out,
            err,
            done: Some(done),
        }
    }

    pub fn stdio(style: StyleOptions, done: oneshot::Sender<Outcome>) -> Self {
        Self::new(
            style,
            Box::new(std::io::stdout()),
            Box::new(std::io::stderr()),
            done,
        )
    }
}

impl Output for TextSink {
    fn out(&mut self, name: &str, value: Option<&str>) -> Result<(), LangError> {
        let pad = " ".repeat(self.depth * self.style.indent);
        let name = color(Role::Primary, name, &self.style);
        let written = match value {
            Some(v) => writeln!(self.out, "{pad}{name}: {v}"),
            None => writeln!(self.out, "{pad}{name}"),
        };
        written.map_err(|e| LangError::Output(e.to_string()))
    }

    fn down(&mut self) {
        self.depth += 1;
    }

    fn up(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn done(&mut self, error: Option<&LangError>) {
        if let Some(e) = error {
            let msg = format!("error: {e} ({})", e.code());
            let _ = writeln!(self.err, "{}", color(Role::Error, msg, &self.style));
        }
        let _ = self.out.flush();
        if let Some(tx) = self.done.take() {
            let _ = tx.send(error.cloned());
        }
    }
}

/* -------------------------------------------------------------------------- */
/* JSON                                                                        */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Node {
    pub name: String,
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

#[derive(Debug, Serialize)]
struct Document<'a> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<i32>,
    results: &'a [Node],
}

pub struct JsonSink {
    roots: Vec<Node>,
    /// Child index at each open scope, from the top.
    path: Vec<usize>,
    out: Box<dyn Write + Send>,
    done: Option<oneshot::Sender<Outcome>>,
}

impl JsonSink {
    pub fn new(out: Box<dyn Write + Send>, done: oneshot::Sender<Outcome>) -> Self {
        Self {
            roots: Vec::new(),
            path: Vec::new(),
            out,
            done: Some(done),
        }
    }

    pub fn stdout(done: oneshot::Sender<Outcome>) -> Self {
        Self::new(Box::new(std::io::stdout()), done)
    }

    fn current(&mut self) -> &mut Vec<Node> {
        let mut level = &mut self.roots;
        for &idx in &self.path {
            level = &mut level[idx].children;
        }
        level
    }
}

impl Output for JsonSink {
    fn out(&mut self, name: &str, value: Option<&str>) -> Result<(), LangError> {
        self.current().push(Node {
            name: name.to_string(),
            value: value.map(str::to_string),
            children: Vec::new(),
        });
        Ok(())
    }

    fn down(&mut self) {
        // A scope opened before any pair hangs off an unnamed placeholder.
        if self.current().is_empty() {
            self.current().push(Node::default());
        }
        let last = self.current().len() - 1;
        self.path.push(last);
    }

    fn up(&mut self) {
        self.path.pop();
    }

    fn done(&mut self, error: Option<&LangError>) {
        let doc = Document {
            status: if error.is_some() { "error" } else { "ok" },
            error: error.map(|e| e.to_string()),
            code: error.map(LangError::code),
            results: &self.roots,
        };
        match serde_json::to_string(&doc) {
            Ok(line) => {
                let _ = writeln!(self.out, "{line}");
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize results"),
        }
        let _ = self.out.flush();
        if let Some(tx) = self.done.take() {
            let _ = tx.send(error.cloned());
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// `Write` into a shared buffer.
    #[derive(Clone, Default)]
    pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn text_sink_indents_scopes() {
        let (tx, mut rx) = oneshot::channel();
        let out = SharedBuf::default();
        let err = SharedBuf::default();
        let mut sink = TextSink::new(
            StyleOptions::plain(),
            Box::new(out.clone()),
            Box::new(err.clone()),
            tx,
        );
        sink.out("Domain", Some("lab")).unwrap();
        sink.down();
        sink.out("Entity", Some("7.1")).unwrap();
        sink.out("Present", None).unwrap();
        sink.up();
        sink.done(None);

        assert_eq!(out.text(), "Domain: lab\n  Entity: 7.1\n  Present\n");
        assert!(err.text().is_empty());
        assert_eq!(rx.try_recv().unwrap(), None);
    }

    #[test]
    fn text_sink_reports_error() {
        let (tx, mut rx) = oneshot::channel();
        let out = SharedBuf::default();
        let err = SharedBuf::default();
        let mut sink = TextSink::new(
            StyleOptions::plain(),
            Box::new(out.clone()),
            Box::new(err.clone()),
            tx,
        );
        sink.done(Some(&LangError::CommandNotFound));
        assert_eq!(err.text(), "error: Command not found (38)\n");
        assert_eq!(rx.try_recv().unwrap(), Some(LangError::CommandNotFound));
    }

    #[test]
    fn json_sink_builds_tree() {
        let (tx, _rx) = oneshot::channel();
        let out = SharedBuf::default();
        let mut sink = JsonSink::new(Box::new(out.clone()), tx);
        sink.out("Domain", Some("lab")).unwrap();
        sink.down();
        sink.out("Entity", Some("7.1")).unwrap();
        sink.up();
        sink.out("Domain", Some("spare")).unwrap();
        sink.done(None);

        let v: serde_json::Value = serde_json::from_str(out.text().trim()).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "status": "ok",
                "results": [
                    {"name": "Domain", "value": "lab",
                     "children": [{"name": "Entity", "value": "7.1"}]},
                    {"name": "Domain", "value": "spare"}
                ]
            })
        );
    }

    #[test]
    fn json_sink_error_document() {
        let (tx, _rx) = oneshot::channel();
        let out = SharedBuf::default();
        let mut sink = JsonSink::new(Box::new(out.clone()), tx);
        sink.done(Some(&LangError::NoCommand));
        let v: serde_json::Value = serde_json::from_str(out.text().trim()).unwrap();
        assert_eq!(v["status"], "error");
        assert_eq!(v["error"], "No command");
        assert_eq!(v["code"], 42);
    }
}
