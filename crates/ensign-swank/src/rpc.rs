//! Typed facade over the swank RPC surface.
//!
//! Each method builds its call form, issues it through the session,
//! and reads the reply into a typed value. Synchronous methods return
//! `Ok(None)` when the server failed or never answered; `Err` is
//! reserved for local problems (dead session, malformed reply).

use std::sync::Arc;

use ensign_sexp::Sexp;

use crate::error::SwankError;
use crate::registry::{AsyncCallback, Executor};
use crate::session::{Outcome, SwankSession};
use crate::types::{
    Completions, DebugBacktrace, DebugKickoffResult, DebugLocation, DebugValue, TypeInfo,
};
use crate::wire::method_symbol;

/// A single edit in a patch-source request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchEdit {
    /// Insert `text` at character offset `at`.
    Insert { at: i64, text: String },
    /// Delete the characters in `[from, to)`.
    Delete { from: i64, to: i64 },
}

impl PatchEdit {
    fn to_sexp(&self) -> Sexp {
        match self {
            PatchEdit::Insert { at, text } => Sexp::list(vec![
                Sexp::string("+"),
                Sexp::Int(*at),
                Sexp::string(text.clone()),
            ]),
            PatchEdit::Delete { from, to } => {
                Sexp::list(vec![Sexp::string("-"), Sexp::Int(*from), Sexp::Int(*to)])
            }
        }
    }
}

/// Handle for issuing RPC calls over one session. Cheap to clone.
#[derive(Clone)]
pub struct Rpc {
    session: Arc<SwankSession>,
}

impl Rpc {
    pub fn new(session: Arc<SwankSession>) -> Self {
        Rpc { session }
    }

    pub fn session(&self) -> &Arc<SwankSession> {
        &self.session
    }

    async fn call(&self, name: &str, args: Vec<Sexp>) -> Result<Outcome, SwankError> {
        let method = method_symbol(name);
        let mut form = vec![Sexp::sym(method.clone())];
        form.extend(args);
        self.session.call_sync(&method, Sexp::List(form)).await
    }

    /// Issue a call whose reply goes to `callback` instead of blocking
    /// the caller.
    pub async fn call_with_callback(
        &self,
        name: &str,
        args: Vec<Sexp>,
        callback: AsyncCallback,
        executor: Option<Arc<dyn Executor>>,
    ) -> Result<i64, SwankError> {
        let method = method_symbol(name);
        let mut form = vec![Sexp::sym(method.clone())];
        form.extend(args);
        self.session
            .call_async(&method, Sexp::List(form), callback, executor)
            .await
    }

    fn raw(outcome: Outcome) -> Option<Sexp> {
        match outcome {
            Outcome::Ok(payload) => Some(payload),
            Outcome::Failed(_) | Outcome::NoResponse => None,
        }
    }

    /// First handshake request; identifies the server.
    pub async fn connection_info(&self) -> Result<Option<Sexp>, SwankError> {
        Ok(Self::raw(self.call("connection_info", vec![]).await?))
    }

    /// Second handshake request; hands the server the project config.
    pub async fn init_project(&self, config: Sexp) -> Result<Option<Sexp>, SwankError> {
        Ok(Self::raw(self.call("init_project", vec![config]).await?))
    }

    pub async fn shutdown_server(&self) -> Result<(), SwankError> {
        self.call("shutdown_server", vec![]).await?;
        Ok(())
    }

    pub async fn typecheck_file(&self, file: &str) -> Result<Option<Sexp>, SwankError> {
        Ok(Self::raw(
            self.call("typecheck_file", vec![Sexp::string(file)]).await?,
        ))
    }

    /// Push unsaved buffer edits to the analyzer.
    pub async fn patch_source(
        &self,
        file: &str,
        edits: &[PatchEdit],
    ) -> Result<Option<Sexp>, SwankError> {
        let edit_forms = edits.iter().map(PatchEdit::to_sexp).collect();
        Ok(Self::raw(
            self.call(
                "patch_source",
                vec![Sexp::string(file), Sexp::List(edit_forms)],
            )
            .await?,
        ))
    }

    pub async fn completions(
        &self,
        file: &str,
        position: i64,
        max_results: i64,
    ) -> Result<Option<Completions>, SwankError> {
        match self
            .call(
                "completions",
                vec![
                    Sexp::string(file),
                    Sexp::Int(position),
                    Sexp::Int(max_results),
                    Sexp::Nil,
                    Sexp::Nil,
                ],
            )
            .await?
        {
            Outcome::Ok(payload) => Ok(Some(Completions::from_sexp(&payload)?)),
            _ => Ok(None),
        }
    }

    pub async fn type_at_point(
        &self,
        file: &str,
        position: i64,
    ) -> Result<Option<TypeInfo>, SwankError> {
        match self
            .call(
                "type_at_point",
                vec![Sexp::string(file), Sexp::Int(position)],
            )
            .await?
        {
            Outcome::Ok(Sexp::Nil) => Ok(None),
            Outcome::Ok(payload) => Ok(Some(TypeInfo::from_sexp(&payload)?)),
            _ => Ok(None),
        }
    }

    pub async fn debug_set_break(&self, file: &str, line: i64) -> Result<Option<Sexp>, SwankError> {
        Ok(Self::raw(
            self.call("_debug_set_break", vec![Sexp::string(file), Sexp::Int(line)])
                .await?,
        ))
    }

    pub async fn debug_clear_break(
        &self,
        file: &str,
        line: i64,
    ) -> Result<Option<Sexp>, SwankError> {
        Ok(Self::raw(
            self.call(
                "_debug_clear_break",
                vec![Sexp::string(file), Sexp::Int(line)],
            )
            .await?,
        ))
    }

    pub async fn debug_clear_all_breaks(&self) -> Result<Option<Sexp>, SwankError> {
        Ok(Self::raw(self.call("_debug_clear_all_breaks", vec![]).await?))
    }

    /// Launch a debuggee VM running `command_line`.
    pub async fn debug_start(
        &self,
        command_line: &str,
    ) -> Result<Option<DebugKickoffResult>, SwankError> {
        match self
            .call("_debug_start", vec![Sexp::string(command_line)])
            .await?
        {
            Outcome::Ok(payload) => Ok(Some(DebugKickoffResult::from_sexp(&payload)?)),
            _ => Ok(None),
        }
    }

    /// Attach to a debuggee VM already listening at `host:port`.
    pub async fn debug_attach(
        &self,
        host: &str,
        port: &str,
    ) -> Result<Option<DebugKickoffResult>, SwankError> {
        match self
            .call(
                "_debug_attach",
                vec![Sexp::string(host), Sexp::string(port)],
            )
            .await?
        {
            Outcome::Ok(payload) => Ok(Some(DebugKickoffResult::from_sexp(&payload)?)),
            _ => Ok(None),
        }
    }

    pub async fn debug_stop(&self) -> Result<Option<Sexp>, SwankError> {
        Ok(Self::raw(self.call("_debug_stop", vec![]).await?))
    }

    pub async fn debug_step(&self, thread_id: i64) -> Result<Option<Sexp>, SwankError> {
        Ok(Self::raw(
            self.call("_debug_step", vec![Sexp::Int(thread_id)]).await?,
        ))
    }

    pub async fn debug_next(&self, thread_id: i64) -> Result<Option<Sexp>, SwankError> {
        Ok(Self::raw(
            self.call("_debug_next", vec![Sexp::Int(thread_id)]).await?,
        ))
    }

    pub async fn debug_continue(&self, thread_id: i64) -> Result<Option<Sexp>, SwankError> {
        Ok(Self::raw(
            self.call("_debug_continue", vec![Sexp::Int(thread_id)])
                .await?,
        ))
    }

    pub async fn debug_backtrace(
        &self,
        thread_id: i64,
        first_frame: i64,
        num_frames: i64,
    ) -> Result<Option<DebugBacktrace>, SwankError> {
        match self
            .call(
                "_debug_backtrace",
                vec![
                    Sexp::Int(thread_id),
                    Sexp::Int(first_frame),
                    Sexp::Int(num_frames),
                ],
            )
            .await?
        {
            Outcome::Ok(payload) => Ok(Some(DebugBacktrace::from_sexp(&payload)?)),
            _ => Ok(None),
        }
    }

    pub async fn debug_value(
        &self,
        location: &DebugLocation,
    ) -> Result<Option<DebugValue>, SwankError> {
        match self.call("_debug_value", vec![location.to_sexp()]).await? {
            Outcome::Ok(payload) => Ok(Some(DebugValue::from_sexp(&payload)?)),
            _ => Ok(None),
        }
    }

    /// Render a value via the debuggee's own `toString`.
    pub async fn debug_to_string(
        &self,
        thread_id: i64,
        location: &DebugLocation,
    ) -> Result<Option<String>, SwankError> {
        match self
            .call(
                "_debug_to_string",
                vec![Sexp::Int(thread_id), location.to_sexp()],
            )
            .await?
        {
            Outcome::Ok(Sexp::Str(text)) => Ok(Some(text)),
            Outcome::Ok(payload) => Ok(DebugValue::from_sexp(&payload)?.summary),
            _ => Ok(None),
        }
    }
}
