//! ensign-debug — debugger state on top of the swank client.
//!
//! Holds the breakpoint table, tracks the debuggee lifecycle through
//! pushed debug events, and inspects suspended-thread values lazily.

pub mod breakpoint;
pub mod error;
pub mod inspect;
pub mod session;

pub use breakpoint::BreakpointSet;
pub use error::DebugError;
pub use inspect::{InspectCtx, InspectNode, InspectSettings, NodeKind};
pub use session::{subscribe_debug_events, DebugState, Debugger, Focus};
