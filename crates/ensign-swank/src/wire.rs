//! Message shapes on the swank wire.
//!
//! Outbound requests wrap an RPC call in `(:swank-rpc <call> <id>)`.
//! Inbound traffic is either a `(:return ...)` reply correlated by id,
//! or a pushed notification tagged by its leading keyword.

use ensign_sexp::Sexp;

use crate::error::SwankError;

/// Translate an API-level method name to its wire symbol.
///
/// Leading underscores are dropped, the rest swap underscores for
/// dashes, and the `swank:` namespace is prefixed:
/// `_debug_start` becomes `swank:debug-start`.
pub fn method_symbol(name: &str) -> String {
    let trimmed = name.trim_start_matches('_');
    format!("swank:{}", trimmed.replace('_', "-"))
}

/// Wrap a call form in the request envelope.
pub fn request(call: Sexp, id: i64) -> Sexp {
    Sexp::list(vec![Sexp::key("swank-rpc"), call, Sexp::Int(id)])
}

/// The verdict carried by a `(:return ...)` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyStatus {
    /// `(:ok <payload>)` — the call succeeded.
    Ok(Sexp),
    /// `(:abort <code> <detail>)` — the server refused the call.
    Abort { code: i64, detail: String },
    /// `(:error <code> <detail>)` — the server failed internally.
    Error { code: i64, detail: String },
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A reply to the request with this id.
    Return { id: i64, status: ReplyStatus },
    /// A server-initiated notification.
    Push { tag: String, payload: Sexp },
}

/// Collapse the elements that remain once the envelope is stripped:
/// none is `nil`, one is passed through bare, several stay a list.
pub fn collapse(items: &[Sexp]) -> Sexp {
    match items {
        [] => Sexp::Nil,
        [one] => one.clone(),
        many => Sexp::List(many.to_vec()),
    }
}

/// Classify one parsed inbound message.
pub fn classify(message: Sexp) -> Result<Inbound, SwankError> {
    let items = match &message {
        Sexp::List(items) if !items.is_empty() => items,
        _ => {
            return Err(SwankError::Malformed(format!(
                "inbound message is not a tagged list: {}",
                message
            )))
        }
    };
    let tag = match items[0].as_key() {
        Some(tag) => tag,
        None => {
            return Err(SwankError::Malformed(format!(
                "inbound message does not start with a keyword: {}",
                message
            )))
        }
    };
    if tag != "return" {
        return Ok(Inbound::Push {
            tag: tag.to_string(),
            payload: collapse(&items[1..]),
        });
    }

    let (status_form, id_form) = match &items[1..] {
        [status, id] => (status, id),
        _ => {
            return Err(SwankError::Malformed(format!(
                "reply is not (:return <status> <id>): {}",
                message
            )))
        }
    };
    let id = id_form
        .as_int()
        .ok_or_else(|| SwankError::Malformed(format!("reply id is not an integer: {}", message)))?;
    let status_items = status_form
        .as_list()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| SwankError::Malformed(format!("reply status is not a list: {}", message)))?;
    let status = match status_items[0].as_key() {
        Some("ok") => ReplyStatus::Ok(collapse(&status_items[1..])),
        Some(kind @ ("abort" | "error")) => {
            let (code, detail) = match &status_items[1..] {
                [code, detail] => (
                    code.as_int().ok_or_else(|| {
                        SwankError::Malformed(format!("{} code is not an integer: {}", kind, message))
                    })?,
                    detail.as_str().unwrap_or_default().to_string(),
                ),
                _ => {
                    return Err(SwankError::Malformed(format!(
                        "{} status is missing code or detail: {}",
                        kind, message
                    )))
                }
            };
            if kind == "abort" {
                ReplyStatus::Abort { code, detail }
            } else {
                ReplyStatus::Error { code, detail }
            }
        }
        _ => {
            return Err(SwankError::Malformed(format!(
                "unknown reply status: {}",
                message
            )))
        }
    };
    Ok(Inbound::Return { id, status })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensign_sexp::parse;

    #[test]
    fn method_symbol_translation() {
        assert_eq!(method_symbol("_debug_start"), "swank:debug-start");
        assert_eq!(method_symbol("typecheck_file"), "swank:typecheck-file");
        assert_eq!(method_symbol("shutdown_server"), "swank:shutdown-server");
    }

    #[test]
    fn request_envelope() {
        let call = Sexp::list(vec![Sexp::sym("swank:connection-info")]);
        assert_eq!(
            request(call, 1).to_string(),
            "(:swank-rpc (swank:connection-info) 1)"
        );
    }

    #[test]
    fn classify_ok_return() {
        let msg = parse("(:return (:ok (:pid nil :version \"1.0\")) 4)").unwrap();
        match classify(msg).unwrap() {
            Inbound::Return {
                id,
                status: ReplyStatus::Ok(payload),
            } => {
                assert_eq!(id, 4);
                assert!(payload.as_list().is_some());
            }
            other => panic!("expected ok return, got {:?}", other),
        }
    }

    #[test]
    fn classify_abort_return() {
        let msg = parse("(:return (:abort 210 \"Initializing\") 2)").unwrap();
        assert_eq!(
            classify(msg).unwrap(),
            Inbound::Return {
                id: 2,
                status: ReplyStatus::Abort {
                    code: 210,
                    detail: "Initializing".to_string()
                }
            }
        );
    }

    #[test]
    fn classify_push_collapses_payload() {
        // Single payload element comes through bare.
        let msg = parse("(:background-message 105 \"Indexing\")").unwrap();
        match classify(msg).unwrap() {
            Inbound::Push { tag, payload } => {
                assert_eq!(tag, "background-message");
                assert_eq!(payload.as_list().map(<[Sexp]>::len), Some(2));
            }
            other => panic!("expected push, got {:?}", other),
        }

        let msg = parse("(:compiler-ready)").unwrap();
        assert_eq!(
            classify(msg).unwrap(),
            Inbound::Push {
                tag: "compiler-ready".to_string(),
                payload: Sexp::Nil
            }
        );

        let msg = parse("(:scala-notes (:notes ()))").unwrap();
        match classify(msg).unwrap() {
            Inbound::Push { tag, payload } => {
                assert_eq!(tag, "scala-notes");
                assert!(payload.as_list().is_some());
            }
            other => panic!("expected push, got {:?}", other),
        }
    }

    #[test]
    fn classify_rejects_untagged() {
        assert!(classify(parse("(1 2 3)").unwrap()).is_err());
        assert!(classify(parse("42").unwrap()).is_err());
        assert!(classify(parse("(:return (:ok t))").unwrap()).is_err());
        assert!(classify(parse("(:return (:what 1 \"x\") 3)").unwrap()).is_err());
    }
}
