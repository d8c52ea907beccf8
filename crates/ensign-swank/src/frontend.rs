//! The editor-facing surface the client reports into.

use crate::types::Note;

/// Which compiler a batch of notes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteLang {
    Scala,
    Java,
}

/// Callbacks the session invokes as the server pushes state at us.
///
/// Implementations are called from the session's reader task and must
/// not block; an editor frontend typically forwards onto its UI queue.
pub trait Frontend: Send + Sync {
    /// Transient status text, e.g. background progress.
    fn status_message(&self, message: &str);

    /// A user-visible error.
    fn error_message(&self, message: &str);

    /// The analyzer finished warming up.
    fn compiler_ready(&self) {}

    /// The symbol index is built.
    fn indexer_ready(&self) {}

    /// A full typecheck pass completed.
    fn full_typecheck_finished(&self) {}

    /// A fresh batch of diagnostics for one language.
    fn notes(&self, lang: NoteLang, notes: Vec<Note>);

    /// Drop all stored diagnostics for one language.
    fn clear_notes(&self, lang: NoteLang);
}

/// A frontend that swallows everything. Useful headless and in tests.
pub struct NullFrontend;

impl Frontend for NullFrontend {
    fn status_message(&self, _message: &str) {}
    fn error_message(&self, _message: &str) {}
    fn notes(&self, _lang: NoteLang, _notes: Vec<Note>) {}
    fn clear_notes(&self, _lang: NoteLang) {}
}
