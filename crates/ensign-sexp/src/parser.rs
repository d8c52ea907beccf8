//! Recursive-descent reader for the wire dialect.
//!
//! Accepts `;` line comments so the same reader can load hand-edited
//! config files as well as server frames.

use crate::error::SexpError;
use crate::value::Sexp;

/// Parse one complete value from `input`.
///
/// Leading and trailing whitespace and comments are allowed; anything
/// else after the first value is a [`SexpError::TrailingData`].
pub fn parse(input: &str) -> Result<Sexp, SexpError> {
    let mut p = Parser {
        chars: input.char_indices().peekable(),
    };
    p.skip_trivia();
    let value = p.value()?;
    p.skip_trivia();
    match p.chars.peek() {
        Some(&(pos, _)) => Err(SexpError::TrailingData { pos }),
        None => Ok(value),
    }
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn skip_trivia(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
            } else if ch == ';' {
                // Comment runs to end of line.
                while let Some(&(_, ch)) = self.chars.peek() {
                    self.chars.next();
                    if ch == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn value(&mut self) -> Result<Sexp, SexpError> {
        match self.chars.peek() {
            None => Err(SexpError::UnexpectedEof),
            Some(&(pos, ch)) => match ch {
                '(' => self.list(),
                ')' => Err(SexpError::UnbalancedParen { pos }),
                '"' => self.string(),
                _ => self.atom(),
            },
        }
    }

    fn list(&mut self) -> Result<Sexp, SexpError> {
        self.chars.next(); // consume '('
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.chars.peek() {
                None => return Err(SexpError::UnexpectedEof),
                Some(&(_, ')')) => {
                    self.chars.next();
                    return Ok(Sexp::List(items));
                }
                Some(_) => items.push(self.value()?),
            }
        }
    }

    fn string(&mut self) -> Result<Sexp, SexpError> {
        self.chars.next(); // consume opening quote
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(SexpError::UnexpectedEof),
                Some((_, '"')) => return Ok(Sexp::Str(out)),
                Some((_, '\\')) => match self.chars.next() {
                    None => return Err(SexpError::UnexpectedEof),
                    Some((_, '"')) => out.push('"'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((pos, ch)) => return Err(SexpError::BadEscape { ch, pos }),
                },
                Some((_, ch)) => out.push(ch),
            }
        }
    }

    fn atom(&mut self) -> Result<Sexp, SexpError> {
        let start = match self.chars.peek() {
            Some(&(pos, _)) => pos,
            None => return Err(SexpError::UnexpectedEof),
        };
        let mut text = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' || ch == ';' {
                break;
            }
            text.push(ch);
            self.chars.next();
        }
        if text.is_empty() {
            // Unreachable via value(), but keep the reader total.
            return Err(SexpError::UnexpectedChar { ch: ' ', pos: start });
        }
        if let Some(name) = text.strip_prefix(':') {
            if name.is_empty() {
                return Err(SexpError::UnexpectedChar { ch: ':', pos: start });
            }
            return Ok(Sexp::Key(name.to_string()));
        }
        match text.as_str() {
            "nil" => Ok(Sexp::Nil),
            "t" => Ok(Sexp::True),
            _ => {
                if let Ok(i) = text.parse::<i64>() {
                    Ok(Sexp::Int(i))
                } else {
                    Ok(Sexp::Sym(text))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::key_map;

    #[test]
    fn atoms() {
        assert_eq!(parse("nil").unwrap(), Sexp::Nil);
        assert_eq!(parse("t").unwrap(), Sexp::True);
        assert_eq!(parse("42").unwrap(), Sexp::Int(42));
        assert_eq!(parse("-7").unwrap(), Sexp::Int(-7));
        assert_eq!(parse(":line").unwrap(), Sexp::key("line"));
        assert_eq!(parse("swank:init-project").unwrap(), Sexp::sym("swank:init-project"));
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            parse(r#""a \"b\" \\ \n\t""#).unwrap(),
            Sexp::string("a \"b\" \\ \n\t")
        );
    }

    #[test]
    fn bad_escape_rejected() {
        assert!(matches!(
            parse(r#""\q""#),
            Err(SexpError::BadEscape { ch: 'q', .. })
        ));
    }

    #[test]
    fn nested_lists() {
        let v = parse("(:return (:ok (:pid nil)) 1)").unwrap();
        let items = v.as_list().unwrap();
        assert_eq!(items[0], Sexp::key("return"));
        assert_eq!(items[2], Sexp::Int(1));
        let inner = items[1].as_list().unwrap();
        assert_eq!(inner[0], Sexp::key("ok"));
    }

    #[test]
    fn comments_skipped() {
        let text = "\n;; project config\n(:root-dir \".\" ; inline note\n :name \"demo\")\n";
        let v = parse(text).unwrap();
        let m = key_map(v.as_list().unwrap());
        assert_eq!(m["root-dir"].as_str(), Some("."));
        assert_eq!(m["name"].as_str(), Some("demo"));
    }

    #[test]
    fn trailing_data_rejected() {
        assert!(matches!(parse("(1) (2)"), Err(SexpError::TrailingData { .. })));
    }

    #[test]
    fn unbalanced_rejected() {
        assert!(matches!(parse("(1 2"), Err(SexpError::UnexpectedEof)));
        assert!(matches!(parse(")"), Err(SexpError::UnbalancedParen { pos: 0 })));
    }

    #[test]
    fn print_parse_round_trip() {
        let v = parse("(:swank-rpc (swank:debug-set-break \"A.scala\" 12) 3)").unwrap();
        assert_eq!(parse(&v.to_string()).unwrap(), v);
    }
}
