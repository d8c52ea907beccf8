//! The S-expression value type and its helpers.

use std::collections::HashMap;
use std::fmt;

/// A single S-expression value.
///
/// The wire dialect is small: `nil`, `t`, integers, double-quoted strings,
/// symbols, keywords (`:file`), and lists. Keywords are stored without the
/// leading colon; [`fmt::Display`] puts it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sexp {
    /// The atom `nil` (also the empty-ish / false value).
    Nil,
    /// The atom `t`.
    True,
    /// A signed integer.
    Int(i64),
    /// A double-quoted string.
    Str(String),
    /// A bare symbol, e.g. `swank:init-project`.
    Sym(String),
    /// A keyword, e.g. `:file` (stored as `"file"`).
    Key(String),
    /// A parenthesised list.
    List(Vec<Sexp>),
}

impl Sexp {
    /// Build a string value.
    pub fn string(s: impl Into<String>) -> Self {
        Sexp::Str(s.into())
    }

    /// Build a symbol.
    pub fn sym(s: impl Into<String>) -> Self {
        Sexp::Sym(s.into())
    }

    /// Build a keyword (pass the name without the colon).
    pub fn key(s: impl Into<String>) -> Self {
        Sexp::Key(s.into())
    }

    /// Build a list.
    pub fn list(items: Vec<Sexp>) -> Self {
        Sexp::List(items)
    }

    /// `t` / `nil` for a boolean.
    pub fn bool(b: bool) -> Self {
        if b {
            Sexp::True
        } else {
            Sexp::Nil
        }
    }

    /// Whether this value is `nil`.
    pub fn is_nil(&self) -> bool {
        matches!(self, Sexp::Nil)
    }

    /// The integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Sexp::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Sexp::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The symbol name, if this is a `Sym`.
    pub fn as_sym(&self) -> Option<&str> {
        match self {
            Sexp::Sym(s) => Some(s),
            _ => None,
        }
    }

    /// The keyword name (colon stripped), if this is a `Key`.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Sexp::Key(s) => Some(s),
            _ => None,
        }
    }

    /// The element slice, if this is a `List`. `nil` doubles as the
    /// empty list, matching how the server encodes absent collections.
    pub fn as_list(&self) -> Option<&[Sexp]> {
        match self {
            Sexp::List(items) => Some(items),
            Sexp::Nil => Some(&[]),
            _ => None,
        }
    }
}

/// Interpret a list of alternating keywords and values as a map.
///
/// Non-keyword positions where a key is expected are skipped, and a
/// duplicate key keeps its last value, mirroring how permissive the
/// server-side plist handling is.
pub fn key_map(items: &[Sexp]) -> HashMap<&str, &Sexp> {
    let mut map = HashMap::new();
    let mut iter = items.iter();
    while let Some(item) = iter.next() {
        if let Sexp::Key(name) = item {
            if let Some(value) = iter.next() {
                map.insert(name.as_str(), value);
            }
        }
    }
    map
}

fn escape_into(out: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(out, "\"")?;
    for ch in s.chars() {
        match ch {
            '"' => write!(out, "\\\"")?,
            '\\' => write!(out, "\\\\")?,
            _ => write!(out, "{}", ch)?,
        }
    }
    write!(out, "\"")
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexp::Nil => write!(f, "nil"),
            Sexp::True => write!(f, "t"),
            Sexp::Int(i) => write!(f, "{}", i),
            Sexp::Str(s) => escape_into(f, s),
            Sexp::Sym(s) => write!(f, "{}", s),
            Sexp::Key(s) => write!(f, ":{}", s),
            Sexp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_atoms() {
        assert_eq!(Sexp::Nil.to_string(), "nil");
        assert_eq!(Sexp::True.to_string(), "t");
        assert_eq!(Sexp::Int(-42).to_string(), "-42");
        assert_eq!(Sexp::sym("swank:typecheck-file").to_string(), "swank:typecheck-file");
        assert_eq!(Sexp::key("file").to_string(), ":file");
    }

    #[test]
    fn display_string_escapes() {
        assert_eq!(
            Sexp::string(r#"say "hi" \now"#).to_string(),
            r#""say \"hi\" \\now""#
        );
    }

    #[test]
    fn display_nested_list() {
        let v = Sexp::list(vec![
            Sexp::key("swank-rpc"),
            Sexp::list(vec![Sexp::sym("swank:shutdown-server")]),
            Sexp::Int(1),
        ]);
        assert_eq!(v.to_string(), "(:swank-rpc (swank:shutdown-server) 1)");
    }

    #[test]
    fn bool_round_trip() {
        assert_eq!(Sexp::bool(true), Sexp::True);
        assert_eq!(Sexp::bool(false), Sexp::Nil);
        assert!(Sexp::bool(false).is_nil());
    }

    #[test]
    fn key_map_pairs() {
        let items = vec![
            Sexp::key("file"),
            Sexp::string("A.scala"),
            Sexp::key("line"),
            Sexp::Int(10),
        ];
        let m = key_map(&items);
        assert_eq!(m["file"].as_str(), Some("A.scala"));
        assert_eq!(m["line"].as_int(), Some(10));
        assert!(!m.contains_key("col"));
    }

    #[test]
    fn key_map_duplicate_keeps_last() {
        let items = vec![
            Sexp::key("line"),
            Sexp::Int(1),
            Sexp::key("line"),
            Sexp::Int(2),
        ];
        let m = key_map(&items);
        assert_eq!(m["line"].as_int(), Some(2));
    }

    #[test]
    fn nil_reads_as_empty_list() {
        assert_eq!(Sexp::Nil.as_list(), Some(&[][..]));
        assert_eq!(Sexp::Int(1).as_list(), None);
    }
}
