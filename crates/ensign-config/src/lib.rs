//! ensign-config — on-disk configuration for an analysis project.
//!
//! Two files live next to a project: the `.ensime` S-expression config
//! that seeds the server, and a JSON session file holding breakpoints
//! and launch configurations for the debugger.

pub mod error;
pub mod project;
pub mod session;

pub use error::ConfigError;
pub use project::ProjectConfig;
pub use session::{Breakpoint, Launch, LaunchTarget, SessionData};
