//! ensign-swank — client for the swank analysis server protocol.
//!
//! Frames S-expressions over TCP, correlates replies with requests,
//! routes pushed notifications to an editor frontend, and wraps the
//! whole RPC surface in typed methods.

pub mod dispatch;
pub mod error;
pub mod framing;
pub mod frontend;
pub mod registry;
pub mod rpc;
pub mod session;
pub mod types;
pub mod wire;

pub use dispatch::{Dispatcher, SessionEvent};
pub use error::SwankError;
pub use frontend::{Frontend, NoteLang, NullFrontend};
pub use registry::{AsyncCallback, Completed, Completion, Executor, InlineExecutor, Registry};
pub use rpc::{PatchEdit, Rpc};
pub use session::{Outcome, SessionConfig, SwankSession};
