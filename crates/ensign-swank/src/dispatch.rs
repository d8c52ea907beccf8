//! Routing of classified inbound messages.
//!
//! Replies are matched to their pending request through the registry;
//! pushed notifications go to a registered handler or to the built-in
//! frontend routes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ensign_sexp::Sexp;
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::frontend::{Frontend, NoteLang};
use crate::registry::{Completed, Registry};
use crate::types::Note;
use crate::wire::{Inbound, ReplyStatus};

/// Out-of-band events the session owner must react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The socket died; every pending call was already failed.
    Disconnected(String),
    /// The server aborted one of the first two requests. The session
    /// cannot become usable and should be torn down.
    HandshakeFailed { code: i64, detail: String },
}

/// A subscriber for one notification tag.
pub type PushHandler = Box<dyn Fn(&Sexp) + Send + Sync>;

pub struct Dispatcher {
    registry: Arc<Registry>,
    frontend: Arc<dyn Frontend>,
    handlers: Mutex<HashMap<String, PushHandler>>,
    control: mpsc::UnboundedSender<SessionEvent>,
}

/// Trim the server's boilerplate suffix off an error detail before it
/// reaches the user.
fn prettify_error_detail(detail: &str) -> String {
    let detail = detail.trim();
    match detail.strip_suffix("Check the server log.") {
        Some(rest) => rest.trim_end().to_string(),
        None => detail.to_string(),
    }
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        frontend: Arc<dyn Frontend>,
        control: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Dispatcher {
            registry,
            frontend,
            handlers: Mutex::new(HashMap::new()),
            control,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Subscribe to one notification tag, replacing any previous
    /// subscriber. The built-in route for that tag is shadowed.
    pub fn set_push_handler(&self, tag: &str, handler: PushHandler) {
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.insert(tag.to_string(), handler);
        }
    }

    /// Route one classified message.
    pub fn handle(&self, inbound: Inbound) {
        match inbound {
            Inbound::Return { id, status } => self.handle_return(id, status),
            Inbound::Push { tag, payload } => self.handle_push(&tag, &payload),
        }
    }

    fn handle_return(&self, id: i64, status: ReplyStatus) {
        let pending = match self.registry.take(id) {
            Some(p) => p,
            None => {
                warn!(id, "reply for unknown or already-answered request");
                return;
            }
        };
        match status {
            ReplyStatus::Ok(payload) => pending.completion.complete(Completed {
                success: true,
                payload,
            }),
            ReplyStatus::Error { code, detail } => {
                let detail = prettify_error_detail(&detail);
                error!(id, code, method = %pending.method, %detail, "server error");
                self.frontend
                    .error_message(&format!("Server error: {}", detail));
                pending.completion.complete(Completed {
                    success: false,
                    payload: Sexp::string(detail),
                });
            }
            ReplyStatus::Abort { code, detail } => {
                let detail = prettify_error_detail(&detail);
                error!(id, code, method = %pending.method, %detail, "request aborted");
                pending.completion.complete(Completed {
                    success: false,
                    payload: Sexp::string(detail.clone()),
                });
                if Registry::is_handshake_id(id) {
                    self.frontend
                        .error_message(&format!("Could not initialize project: {}", detail));
                    let _ = self
                        .control
                        .send(SessionEvent::HandshakeFailed { code, detail });
                } else {
                    self.frontend
                        .status_message(&format!("Request aborted: {}", detail));
                }
            }
        }
    }

    fn handle_push(&self, tag: &str, payload: &Sexp) {
        {
            // Subscribers shadow the built-in routes.
            if let Ok(handlers) = self.handlers.lock() {
                if let Some(handler) = handlers.get(tag) {
                    handler(payload);
                    return;
                }
            }
        }
        match tag {
            "compiler-ready" => self.frontend.compiler_ready(),
            "indexer-ready" => self.frontend.indexer_ready(),
            "full-typecheck-finished" => self.frontend.full_typecheck_finished(),
            "background-message" => {
                // Payload is (<code> "text"), or just "text".
                let text = match payload {
                    Sexp::Str(s) => Some(s.as_str()),
                    Sexp::List(items) => items.iter().rev().find_map(|v| v.as_str()),
                    _ => None,
                };
                if let Some(text) = text {
                    self.frontend.status_message(text);
                }
            }
            "scala-notes" => self.route_notes(NoteLang::Scala, payload),
            "java-notes" => self.route_notes(NoteLang::Java, payload),
            "clear-all-scala-notes" => self.frontend.clear_notes(NoteLang::Scala),
            "clear-all-java-notes" => self.frontend.clear_notes(NoteLang::Java),
            _ => warn!(tag, "unhandled notification"),
        }
    }

    fn route_notes(&self, lang: NoteLang, payload: &Sexp) {
        match Note::parse_list(payload) {
            Ok(notes) => self.frontend.notes(lang, notes),
            Err(e) => warn!(?lang, error = %e, "dropping malformed notes batch"),
        }
    }

    /// Fail everything outstanding and tell the owner the socket died.
    pub fn connection_lost(&self, reason: &str) {
        let drained = self.registry.drain();
        warn!(reason, pending = drained.len(), "connection lost");
        for pending in drained {
            pending.completion.complete(Completed {
                success: false,
                payload: Sexp::Nil,
            });
        }
        let _ = self
            .control
            .send(SessionEvent::Disconnected(reason.to_string()));
    }
}
