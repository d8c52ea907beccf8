//! Typed views over reply and notification payloads.
//!
//! The server speaks keyed S-expression lists; everything here is an
//! explicit, field-by-field reading of those lists. A missing or
//! mistyped required field is a [`SwankError::Malformed`].

use std::collections::HashMap;

use ensign_sexp::{key_map, Sexp};

use crate::error::SwankError;

/// The object id the server uses for "no object".
pub const INVALID_OBJECT_ID: i64 = -1;

fn missing(ctx: &str, key: &str) -> SwankError {
    SwankError::Malformed(format!("{}: missing or mistyped :{}", ctx, key))
}

/// Accept an integer, or a string holding one. Thread and object ids
/// arrive in either shape depending on the server build.
fn int_like(value: &Sexp) -> Option<i64> {
    match value {
        Sexp::Int(i) => Some(*i),
        Sexp::Str(s) => s.parse().ok(),
        _ => None,
    }
}

fn req_int(m: &HashMap<&str, &Sexp>, key: &str, ctx: &str) -> Result<i64, SwankError> {
    m.get(key).and_then(|v| int_like(v)).ok_or_else(|| missing(ctx, key))
}

fn req_str(m: &HashMap<&str, &Sexp>, key: &str, ctx: &str) -> Result<String, SwankError> {
    m.get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| missing(ctx, key))
}

fn opt_int(m: &HashMap<&str, &Sexp>, key: &str) -> Option<i64> {
    m.get(key).and_then(|v| int_like(v))
}

fn opt_str(m: &HashMap<&str, &Sexp>, key: &str) -> Option<String> {
    m.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

/// Severity of a compiler note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSeverity {
    Error,
    Warn,
    Info,
}

impl NoteSeverity {
    fn from_sym(sym: &str) -> Self {
        match sym {
            "error" => NoteSeverity::Error,
            "warn" => NoteSeverity::Warn,
            _ => NoteSeverity::Info,
        }
    }
}

/// One compiler diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub file: String,
    pub severity: NoteSeverity,
    pub msg: String,
    pub beg: i64,
    pub end: i64,
    pub line: i64,
    pub col: i64,
}

impl Note {
    pub fn from_sexp(value: &Sexp) -> Result<Self, SwankError> {
        let items = value
            .as_list()
            .ok_or_else(|| SwankError::Malformed(format!("note is not a list: {}", value)))?;
        let m = key_map(items);
        let severity = m
            .get("severity")
            .and_then(|v| v.as_sym())
            .map(NoteSeverity::from_sym)
            .ok_or_else(|| missing("note", "severity"))?;
        Ok(Note {
            file: req_str(&m, "file", "note")?,
            severity,
            msg: req_str(&m, "msg", "note")?,
            beg: req_int(&m, "beg", "note")?,
            end: req_int(&m, "end", "note")?,
            line: req_int(&m, "line", "note")?,
            col: req_int(&m, "col", "note")?,
        })
    }

    /// Read the `(:notes (...))` wrapper a notes notification carries.
    pub fn parse_list(payload: &Sexp) -> Result<Vec<Note>, SwankError> {
        let items = payload
            .as_list()
            .ok_or_else(|| SwankError::Malformed(format!("notes payload: {}", payload)))?;
        let m = key_map(items);
        let notes = m
            .get("notes")
            .and_then(|v| v.as_list())
            .ok_or_else(|| missing("notes payload", "notes"))?;
        notes.iter().map(Note::from_sexp).collect()
    }
}

/// One completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionInfo {
    pub name: String,
    pub type_sig: Option<String>,
    pub is_callable: bool,
}

/// The reply to a completions request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completions {
    pub prefix: Option<String>,
    pub candidates: Vec<CompletionInfo>,
}

impl Completions {
    pub fn from_sexp(payload: &Sexp) -> Result<Self, SwankError> {
        let items = payload
            .as_list()
            .ok_or_else(|| SwankError::Malformed(format!("completions payload: {}", payload)))?;
        let m = key_map(items);
        let mut candidates = Vec::new();
        if let Some(list) = m.get("completions").and_then(|v| v.as_list()) {
            for entry in list {
                let fields = entry.as_list().ok_or_else(|| {
                    SwankError::Malformed(format!("completion entry: {}", entry))
                })?;
                let em = key_map(fields);
                candidates.push(CompletionInfo {
                    name: req_str(&em, "name", "completion entry")?,
                    type_sig: opt_str(&em, "type-sig"),
                    is_callable: em
                        .get("is-callable")
                        .map(|v| !v.is_nil())
                        .unwrap_or(false),
                });
            }
        }
        Ok(Completions {
            prefix: opt_str(&m, "prefix"),
            candidates,
        })
    }
}

/// The reply to a type-at-point request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub name: String,
    pub full_name: Option<String>,
}

impl TypeInfo {
    pub fn from_sexp(payload: &Sexp) -> Result<Self, SwankError> {
        let items = payload
            .as_list()
            .ok_or_else(|| SwankError::Malformed(format!("type payload: {}", payload)))?;
        let m = key_map(items);
        Ok(TypeInfo {
            name: req_str(&m, "name", "type payload")?,
            full_name: opt_str(&m, "full-name"),
        })
    }
}

/// The reply to a debug start or attach request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugKickoffResult {
    pub success: bool,
    pub details: String,
}

impl DebugKickoffResult {
    pub fn from_sexp(payload: &Sexp) -> Result<Self, SwankError> {
        let items = payload
            .as_list()
            .ok_or_else(|| SwankError::Malformed(format!("kickoff payload: {}", payload)))?;
        let m = key_map(items);
        let status = m
            .get("status")
            .and_then(|v| v.as_sym().or_else(|| v.as_str()))
            .ok_or_else(|| missing("kickoff payload", "status"))?;
        Ok(DebugKickoffResult {
            success: status == "success",
            details: opt_str(&m, "details").unwrap_or_default(),
        })
    }
}

/// Where a stack frame sits in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSourcePosition {
    pub file_name: String,
    pub line: i64,
}

impl DebugSourcePosition {
    fn from_sexp(value: &Sexp) -> Result<Self, SwankError> {
        let items = value
            .as_list()
            .ok_or_else(|| SwankError::Malformed(format!("source position: {}", value)))?;
        let m = key_map(items);
        Ok(DebugSourcePosition {
            file_name: req_str(&m, "file", "source position")?,
            line: req_int(&m, "line", "source position")?,
        })
    }
}

/// One local slot in a stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugStackLocal {
    pub index: i64,
    pub name: String,
    pub summary: String,
    pub type_name: String,
}

/// One frame of a backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugStackFrame {
    pub index: i64,
    pub locals: Vec<DebugStackLocal>,
    pub num_args: i64,
    pub class_name: String,
    pub method_name: String,
    pub source_position: DebugSourcePosition,
    pub this_object_id: i64,
}

impl DebugStackFrame {
    fn from_sexp(value: &Sexp) -> Result<Self, SwankError> {
        let items = value
            .as_list()
            .ok_or_else(|| SwankError::Malformed(format!("stack frame: {}", value)))?;
        let m = key_map(items);
        let mut locals = Vec::new();
        if let Some(list) = m.get("locals").and_then(|v| v.as_list()) {
            for entry in list {
                let fields = entry
                    .as_list()
                    .ok_or_else(|| SwankError::Malformed(format!("stack local: {}", entry)))?;
                let lm = key_map(fields);
                locals.push(DebugStackLocal {
                    index: req_int(&lm, "index", "stack local")?,
                    name: req_str(&lm, "name", "stack local")?,
                    summary: req_str(&lm, "summary", "stack local")?,
                    type_name: req_str(&lm, "type-name", "stack local")?,
                });
            }
        }
        Ok(DebugStackFrame {
            index: req_int(&m, "index", "stack frame")?,
            locals,
            num_args: opt_int(&m, "num-args").unwrap_or(0),
            class_name: req_str(&m, "class-name", "stack frame")?,
            method_name: req_str(&m, "method-name", "stack frame")?,
            source_position: m
                .get("pc-location")
                .map(|v| DebugSourcePosition::from_sexp(v))
                .ok_or_else(|| missing("stack frame", "pc-location"))??,
            this_object_id: opt_int(&m, "this-object-id").unwrap_or(INVALID_OBJECT_ID),
        })
    }
}

/// The reply to a backtrace request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugBacktrace {
    pub thread_id: i64,
    pub thread_name: String,
    pub frames: Vec<DebugStackFrame>,
}

impl DebugBacktrace {
    pub fn from_sexp(payload: &Sexp) -> Result<Self, SwankError> {
        let items = payload
            .as_list()
            .ok_or_else(|| SwankError::Malformed(format!("backtrace payload: {}", payload)))?;
        let m = key_map(items);
        let frames = m
            .get("frames")
            .and_then(|v| v.as_list())
            .ok_or_else(|| missing("backtrace payload", "frames"))?
            .iter()
            .map(DebugStackFrame::from_sexp)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DebugBacktrace {
            thread_id: req_int(&m, "thread-id", "backtrace payload")?,
            thread_name: req_str(&m, "thread-name", "backtrace payload")?,
            frames,
        })
    }
}

/// One field of an inspected object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugObjectField {
    pub index: i64,
    pub name: String,
    pub summary: Option<String>,
    pub type_name: String,
}

/// The shape of an inspected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugValueKind {
    Null,
    Prim,
    Str,
    Obj,
    Arr,
}

/// The reply to a debug-value request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugValue {
    pub kind: DebugValueKind,
    pub type_name: String,
    pub summary: Option<String>,
    pub object_id: Option<i64>,
    pub length: Option<i64>,
    pub element_type_name: Option<String>,
    pub fields: Vec<DebugObjectField>,
}

impl DebugValue {
    pub fn from_sexp(payload: &Sexp) -> Result<Self, SwankError> {
        let items = payload
            .as_list()
            .ok_or_else(|| SwankError::Malformed(format!("debug value payload: {}", payload)))?;
        let m = key_map(items);
        let kind = match m
            .get("val-type")
            .and_then(|v| v.as_sym())
            .ok_or_else(|| missing("debug value", "val-type"))?
        {
            "null" => DebugValueKind::Null,
            "prim" => DebugValueKind::Prim,
            "str" => DebugValueKind::Str,
            "obj" => DebugValueKind::Obj,
            "arr" => DebugValueKind::Arr,
            other => {
                return Err(SwankError::Malformed(format!(
                    "unknown debug value type: {}",
                    other
                )))
            }
        };
        let mut fields = Vec::new();
        if let Some(list) = m.get("fields").and_then(|v| v.as_list()) {
            for entry in list {
                let field_items = entry
                    .as_list()
                    .ok_or_else(|| SwankError::Malformed(format!("object field: {}", entry)))?;
                let fm = key_map(field_items);
                fields.push(DebugObjectField {
                    index: req_int(&fm, "index", "object field")?,
                    name: req_str(&fm, "name", "object field")?,
                    summary: opt_str(&fm, "summary"),
                    type_name: req_str(&fm, "type-name", "object field")?,
                });
            }
        }
        Ok(DebugValue {
            kind,
            type_name: req_str(&m, "type-name", "debug value")?,
            summary: opt_str(&m, "summary"),
            object_id: opt_int(&m, "object-id"),
            length: opt_int(&m, "length"),
            element_type_name: opt_str(&m, "element-type-name"),
            fields,
        })
    }
}

/// A value location the server can read or stringify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugLocation {
    /// A whole object on the heap.
    Reference { object_id: i64 },
    /// One element of an array object.
    Element { object_id: i64, index: i64 },
    /// One named field of an object.
    Field { object_id: i64, field: String },
    /// A local slot of a suspended frame.
    Slot { thread_id: i64, frame: i64, offset: i64 },
}

impl DebugLocation {
    pub fn to_sexp(&self) -> Sexp {
        match self {
            DebugLocation::Reference { object_id } => Sexp::list(vec![
                Sexp::key("type"),
                Sexp::sym("reference"),
                Sexp::key("object-id"),
                Sexp::Int(*object_id),
            ]),
            DebugLocation::Element { object_id, index } => Sexp::list(vec![
                Sexp::key("type"),
                Sexp::sym("element"),
                Sexp::key("object-id"),
                Sexp::Int(*object_id),
                Sexp::key("index"),
                Sexp::Int(*index),
            ]),
            DebugLocation::Field { object_id, field } => Sexp::list(vec![
                Sexp::key("type"),
                Sexp::sym("field"),
                Sexp::key("object-id"),
                Sexp::Int(*object_id),
                Sexp::key("field"),
                Sexp::string(field.clone()),
            ]),
            DebugLocation::Slot {
                thread_id,
                frame,
                offset,
            } => Sexp::list(vec![
                Sexp::key("type"),
                Sexp::sym("slot"),
                Sexp::key("thread-id"),
                Sexp::Int(*thread_id),
                Sexp::key("frame"),
                Sexp::Int(*frame),
                Sexp::key("offset"),
                Sexp::Int(*offset),
            ]),
        }
    }
}

/// Where a suspension left a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugStop {
    pub thread_id: i64,
    pub thread_name: String,
    /// Absent when the server has no source for the location.
    pub file_name: Option<String>,
    pub line: Option<i64>,
}

impl DebugStop {
    fn from_map(m: &HashMap<&str, &Sexp>, ctx: &str) -> Result<Self, SwankError> {
        Ok(DebugStop {
            thread_id: req_int(m, "thread-id", ctx)?,
            thread_name: opt_str(m, "thread-name").unwrap_or_default(),
            file_name: opt_str(m, "file"),
            line: opt_int(m, "line"),
        })
    }
}

/// A debug notification pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    /// The debuggee VM is up.
    Start,
    /// The debuggee VM exited.
    Death,
    /// The server lost its connection to the VM.
    Disconnect,
    /// The debuggee wrote to stdout or stderr.
    Output { body: String },
    /// A step request finished.
    Step(DebugStop),
    /// A breakpoint was hit.
    Breakpoint(DebugStop),
    /// An exception was thrown.
    Exception { exception_id: i64, stop: DebugStop },
    ThreadStart { thread_id: i64 },
    ThreadDeath { thread_id: i64 },
}

impl DebugEvent {
    pub fn from_sexp(payload: &Sexp) -> Result<Self, SwankError> {
        let items = payload
            .as_list()
            .ok_or_else(|| SwankError::Malformed(format!("debug event payload: {}", payload)))?;
        let m = key_map(items);
        let kind = m
            .get("type")
            .and_then(|v| v.as_sym())
            .ok_or_else(|| missing("debug event", "type"))?;
        match kind {
            "start" => Ok(DebugEvent::Start),
            "death" => Ok(DebugEvent::Death),
            "disconnect" => Ok(DebugEvent::Disconnect),
            "output" => Ok(DebugEvent::Output {
                body: req_str(&m, "body", "output event")?,
            }),
            "step" => Ok(DebugEvent::Step(DebugStop::from_map(&m, "step event")?)),
            "breakpoint" => Ok(DebugEvent::Breakpoint(DebugStop::from_map(
                &m,
                "breakpoint event",
            )?)),
            "exception" => Ok(DebugEvent::Exception {
                exception_id: req_int(&m, "exception", "exception event")?,
                stop: DebugStop::from_map(&m, "exception event")?,
            }),
            "threadStart" => Ok(DebugEvent::ThreadStart {
                thread_id: req_int(&m, "thread-id", "thread start event")?,
            }),
            "threadDeath" => Ok(DebugEvent::ThreadDeath {
                thread_id: req_int(&m, "thread-id", "thread death event")?,
            }),
            other => Err(SwankError::Malformed(format!(
                "unknown debug event type: {}",
                other
            ))),
        }
    }
}
