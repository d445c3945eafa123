//! Object address parsing.
//!
//! `parse` -> ObjAddr { domain, class, obj } from `[domain]['('class')']['.'obj]`.
//! Fields borrow from the input; nothing inside the address is escaped.
//!
use std::fmt;

use crate::error::{LangError, Result};

/// The three optional parts of an object address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjAddr<'a> {
    /// Text before the class segment (or the `.`); empty text is `None`.
    pub domain: Option<&'a str>,
    /// Text strictly inside the parentheses; `Some("")` for `()`.
    pub class: Option<&'a str>,
    /// Text after the `.`; empty text is `None`.
    pub obj: Option<&'a str>,
}

impl<'a> ObjAddr<'a> {
    /// Address matching everything.
    pub const ANY: ObjAddr<'static> = ObjAddr {
        domain: None,
        class: None,
        obj: None,
    };

    pub fn domain_only(domain: Option<&'a str>) -> Self {
        Self {
            domain,
            class: None,
            obj: None,
        }
    }

    pub fn is_any(&self) -> bool {
        self.domain.is_none() && self.class.is_none() && self.obj.is_none()
    }
}

impl fmt::Display for ObjAddr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(d) = self.domain {
            f.write_str(d)?;
        }
        if let Some(c) = self.class {
            write!(f, "({c})")?;
        }
        if let Some(o) = self.obj {
            write!(f, ".{o}")?;
        }
        Ok(())
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

/// Parse an address string.
///
/// Scanning Strategy:
/// 1. The first `(` opens the class segment; another `(` before its `)` is an error.
/// 2. A `)` only closes a segment that was opened; otherwise it is ordinary text.
/// 3. A `.` outside the class segment ends the prefix; everything after it is `obj`.
/// 4. After a closed class segment the only thing allowed is `.obj` or end of input.
/// 5. An opened but unclosed class segment is an error.
///
/// Examples:
/// - "dom(ent).sens" -> domain, class, obj
/// - ".objonly"      -> obj only
/// - "a)b"           -> domain "a)b"
pub fn parse(s: &str) -> Result<ObjAddr<'_>> {
    let mut class_start: Option<usize> = None;
    let mut class_end: Option<usize> = None;
    let mut dot: Option<usize> = None;

    for (i, c) in s.char_indices() {
        match c {
            '(' if class_start.is_some() => return Err(LangError::invalid("address")),
            '(' => class_start = Some(i),
            ')' if class_start.is_some() => {
                class_end = Some(i);
                break;
            }
            '.' if class_start.is_none() => {
                dot = Some(i);
                break;
            }
            _ => {}
        }
    }

    let (domain_end, class) = match (class_start, class_end) {
        (Some(open), Some(close)) => {
            let after = &s[close + 1..];
            if !after.is_empty() {
                if !after.starts_with('.') {
                    return Err(LangError::invalid("address"));
                }
                dot = Some(close + 1);
            }
            (open, Some(&s[open + 1..close]))
        }
        (Some(_), None) => return Err(LangError::invalid("address")),
        (None, _) => (dot.unwrap_or(s.len()), None),
    };

    Ok(ObjAddr {
        domain: non_empty(&s[..domain_end]),
        class,
        obj: dot.and_then(|d| non_empty(&s[d + 1..])),
    })
}
