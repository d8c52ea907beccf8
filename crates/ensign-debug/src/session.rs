//! The debugger state machine.
//!
//! One debugger per swank session. Operations are requests to the
//! server; the machine itself only moves when the corresponding debug
//! event comes back, so the editor's view always reflects what the
//! server confirmed. The exceptions are the resume operations, which
//! drop the suspension locally the moment they are sent.

use std::sync::Arc;

use ensign_config::{Launch, LaunchTarget, SessionData};
use ensign_swank::types::{
    DebugBacktrace, DebugEvent, DebugKickoffResult, DebugLocation, DebugStop,
};
use ensign_swank::{Dispatcher, Frontend, Rpc};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::breakpoint::BreakpointSet;
use crate::error::DebugError;
use crate::inspect::{InspectCtx, InspectNode, InspectSettings};

/// Where the debugger is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugState {
    /// No debuggee; launching is allowed.
    Idle,
    /// A debuggee VM is (or is being brought) up and running.
    Running,
    /// A thread is stopped and can be inspected.
    Suspended,
    /// The debuggee went away; launching is allowed again.
    Terminated,
}

/// The thread and position a suspension put in front of the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Focus {
    pub thread_id: i64,
    pub thread_name: String,
    pub file_name: String,
    pub line: i64,
}

impl Focus {
    fn from_stop(stop: &DebugStop) -> Option<Focus> {
        match (&stop.file_name, stop.line) {
            (Some(file_name), Some(line)) => Some(Focus {
                thread_id: stop.thread_id,
                thread_name: stop.thread_name.clone(),
                file_name: file_name.clone(),
                line,
            }),
            _ => None,
        }
    }
}

/// Forward `(:debug-event ...)` pushes into a channel as typed events.
pub fn subscribe_debug_events(dispatcher: &Dispatcher, tx: mpsc::UnboundedSender<DebugEvent>) {
    dispatcher.set_push_handler(
        "debug-event",
        Box::new(move |payload| match DebugEvent::from_sexp(payload) {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => warn!(error = %e, "dropping malformed debug event"),
        }),
    );
}

pub struct Debugger {
    rpc: Rpc,
    frontend: Arc<dyn Frontend>,
    events_tx: mpsc::UnboundedSender<DebugEvent>,
    state: DebugState,
    focus: Option<Focus>,
    backtrace: Option<DebugBacktrace>,
    output: String,
    breakpoints: BreakpointSet,
}

impl Debugger {
    /// `events_tx` must feed the same channel the owner drains into
    /// [`Debugger::handle`]; the debugger synthesizes events through it
    /// when the server will not send one.
    pub fn new(
        rpc: Rpc,
        frontend: Arc<dyn Frontend>,
        events_tx: mpsc::UnboundedSender<DebugEvent>,
    ) -> Self {
        Debugger {
            rpc,
            frontend,
            events_tx,
            state: DebugState::Idle,
            focus: None,
            backtrace: None,
            output: String::new(),
            breakpoints: BreakpointSet::new(),
        }
    }

    pub fn state(&self) -> DebugState {
        self.state
    }

    pub fn focus(&self) -> Option<&Focus> {
        self.focus.as_ref()
    }

    pub fn backtrace(&self) -> Option<&DebugBacktrace> {
        self.backtrace.as_ref()
    }

    /// Everything the debuggee has written so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn breakpoints(&self) -> &BreakpointSet {
        &self.breakpoints
    }

    fn live(&self) -> bool {
        matches!(self.state, DebugState::Running | DebugState::Suspended)
    }

    /// Flip a breakpoint locally, and on the server too when a
    /// debuggee is live. Returns true if the breakpoint is now set.
    pub async fn toggle_breakpoint(&mut self, file_name: &str, line: i64) -> Result<bool, DebugError> {
        let now_set = self.breakpoints.toggle(file_name, line);
        if self.live() {
            if now_set {
                self.rpc.debug_set_break(file_name, line).await?;
            } else {
                self.rpc.debug_clear_break(file_name, line).await?;
            }
        }
        Ok(now_set)
    }

    /// Restore breakpoints from a saved session.
    pub fn load_session(&mut self, data: &SessionData) {
        self.breakpoints.replace(data.breakpoints.clone());
    }

    /// Fold the current breakpoints back into a session for saving.
    pub fn store_session(&self, data: &mut SessionData) {
        data.breakpoints = self.breakpoints.all().to_vec();
    }

    /// Launch (or attach to) the debuggee described by `launch`.
    ///
    /// The server's view of breakpoints is rebuilt first: cleared
    /// wholesale, then repopulated from the local table. The machine
    /// moves to `Running` only when the start event arrives.
    pub async fn start(&mut self, launch: &Launch) -> Result<(), DebugError> {
        match self.state {
            DebugState::Idle | DebugState::Terminated => {}
            _ => return Err(DebugError::rejected("a debuggee is already active")),
        }
        let target = launch.target()?;

        self.output.clear();
        self.rpc.debug_clear_all_breaks().await?;
        for bp in self.breakpoints.all().to_vec() {
            self.rpc.debug_set_break(&bp.file_name, bp.line).await?;
        }

        match target {
            LaunchTarget::Main { command_line } => {
                match self.rpc.debug_start(&command_line).await? {
                    Some(DebugKickoffResult { success: true, .. }) => Ok(()),
                    Some(DebugKickoffResult { details, .. }) => {
                        self.frontend
                            .error_message(&format!("Could not start debuggee: {}", details));
                        Err(DebugError::rejected(details))
                    }
                    None => Err(DebugError::rejected("no response to debug start")),
                }
            }
            LaunchTarget::Remote { host, port } => {
                // The server sends no start event when attaching, so a
                // successful attach synthesizes one.
                let events = self.events_tx.clone();
                let frontend = self.frontend.clone();
                self.rpc
                    .call_with_callback(
                        "_debug_attach",
                        vec![
                            ensign_sexp::Sexp::string(host),
                            ensign_sexp::Sexp::string(port),
                        ],
                        Box::new(move |completed| {
                            let kickoff = completed
                                .success
                                .then(|| DebugKickoffResult::from_sexp(&completed.payload).ok())
                                .flatten();
                            match kickoff {
                                Some(DebugKickoffResult { success: true, .. }) => {
                                    let _ = events.send(DebugEvent::Start);
                                }
                                Some(DebugKickoffResult { details, .. }) => {
                                    frontend.error_message(&format!(
                                        "Could not attach debugger: {}",
                                        details
                                    ));
                                }
                                None => frontend.error_message("Could not attach debugger"),
                            }
                        }),
                        None,
                    )
                    .await?;
                Ok(())
            }
        }
    }

    /// Kill the debuggee.
    pub async fn stop(&mut self) -> Result<(), DebugError> {
        if !self.live() {
            return Err(DebugError::rejected("no debuggee to stop"));
        }
        self.rpc.debug_stop().await?;
        Ok(())
    }

    fn focused_thread(&self) -> Result<i64, DebugError> {
        if self.state != DebugState::Suspended {
            return Err(DebugError::rejected("debuggee is not suspended"));
        }
        self.focus
            .as_ref()
            .map(|f| f.thread_id)
            .ok_or(DebugError::NoFocus)
    }

    fn resume_locally(&mut self) {
        self.state = DebugState::Running;
        self.focus = None;
        self.backtrace = None;
    }

    pub async fn step_into(&mut self) -> Result<(), DebugError> {
        let thread_id = self.focused_thread()?;
        self.rpc.debug_step(thread_id).await?;
        self.resume_locally();
        Ok(())
    }

    pub async fn step_over(&mut self) -> Result<(), DebugError> {
        let thread_id = self.focused_thread()?;
        self.rpc.debug_next(thread_id).await?;
        self.resume_locally();
        Ok(())
    }

    pub async fn continue_run(&mut self) -> Result<(), DebugError> {
        let thread_id = self.focused_thread()?;
        self.rpc.debug_continue(thread_id).await?;
        self.resume_locally();
        Ok(())
    }

    /// Stop the debuggee if one is live and forget all debug state.
    /// Breakpoints survive; they belong to the project, not the run.
    pub async fn shutdown(&mut self) -> Result<(), DebugError> {
        if self.live() {
            let _ = self.rpc.debug_stop().await;
        }
        self.state = DebugState::Idle;
        self.focus = None;
        self.backtrace = None;
        self.output.clear();
        Ok(())
    }

    /// Build an inspection tree for one frame of the current backtrace.
    pub fn inspect_frame(
        &self,
        frame_index: i64,
        settings: InspectSettings,
    ) -> Result<(InspectCtx, Arc<InspectNode>), DebugError> {
        if self.state != DebugState::Suspended {
            return Err(DebugError::rejected("debuggee is not suspended"));
        }
        let backtrace = self.backtrace.as_ref().ok_or(DebugError::NoFocus)?;
        let frame = backtrace
            .frames
            .iter()
            .find(|f| f.index == frame_index)
            .ok_or_else(|| DebugError::rejected(format!("no frame with index {}", frame_index)))?;
        let ctx = InspectCtx {
            rpc: self.rpc.clone(),
            settings,
            thread_id: backtrace.thread_id,
        };
        Ok((ctx, InspectNode::frame_root(frame)))
    }

    async fn suspend(&mut self, stop: &DebugStop) -> Result<(), DebugError> {
        // Fetch before committing the transition so a transport error
        // leaves the machine where it was. -1 asks for the whole stack.
        let backtrace = self.rpc.debug_backtrace(stop.thread_id, 0, -1).await?;
        if backtrace.is_none() {
            warn!(thread_id = stop.thread_id, "suspended without a backtrace");
        }
        self.state = DebugState::Suspended;
        self.focus = Focus::from_stop(stop);
        self.backtrace = backtrace;
        if let Some(focus) = &self.focus {
            self.frontend.status_message(&format!(
                "Suspended at {}:{} (thread {})",
                focus.file_name, focus.line, focus.thread_name
            ));
        }
        Ok(())
    }

    fn terminate(&mut self, why: &str) {
        self.state = DebugState::Terminated;
        self.focus = None;
        self.backtrace = None;
        self.frontend.status_message(why);
    }

    /// Apply one debug event from the server.
    ///
    /// With no active debuggee only a start event means anything;
    /// everything else arriving in `Idle`/`Terminated` is stale and
    /// dropped.
    pub async fn handle(&mut self, event: DebugEvent) -> Result<(), DebugError> {
        if !self.live() && !matches!(event, DebugEvent::Start) {
            debug!(?event, "dropping debug event with no active debuggee");
            return Ok(());
        }
        match event {
            DebugEvent::Start => {
                // Attaching to an already-active debuggee can replay a
                // start event; an active machine ignores it.
                if !self.live() {
                    self.state = DebugState::Running;
                    self.focus = None;
                    self.backtrace = None;
                    self.frontend.status_message("Debuggee is running");
                }
            }
            DebugEvent::Death => self.terminate("Debuggee has exited"),
            DebugEvent::Disconnect => self.terminate("Debuggee has disconnected"),
            DebugEvent::Output { body } => self.output.push_str(&body),
            DebugEvent::Step(stop) | DebugEvent::Breakpoint(stop) => self.suspend(&stop).await?,
            DebugEvent::Exception { exception_id, stop } => {
                self.suspend(&stop).await?;
                let rendered = self
                    .rpc
                    .debug_to_string(
                        stop.thread_id,
                        &DebugLocation::Reference {
                            object_id: exception_id,
                        },
                    )
                    .await?
                    .unwrap_or_else(|| "<unknown exception>".to_string());
                self.output.push_str(&rendered);
                self.output.push('\n');
            }
            DebugEvent::ThreadStart { thread_id } | DebugEvent::ThreadDeath { thread_id } => {
                debug!(thread_id, "thread lifecycle event");
            }
        }
        Ok(())
    }
}
