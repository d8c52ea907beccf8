use thiserror::Error;

/// Errors from driving the debugger.
#[derive(Debug, Error)]
pub enum DebugError {
    #[error(transparent)]
    Swank(#[from] ensign_swank::SwankError),

    #[error(transparent)]
    Config(#[from] ensign_config::ConfigError),

    /// The operation does not apply in the current debugger state.
    #[error("{message}")]
    Rejected { message: String },

    /// An operation needed a suspended thread but none is focused.
    #[error("no thread is suspended")]
    NoFocus,
}

impl DebugError {
    pub(crate) fn rejected(message: impl Into<String>) -> Self {
        DebugError::Rejected {
            message: message.into(),
        }
    }
}
