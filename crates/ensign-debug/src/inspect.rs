//! Lazy inspection of suspended-thread values.
//!
//! An inspection tree starts at a stack frame and grows only where the
//! user expands it. Each node fetches its children and description at
//! most once; collections are capped and continued through a
//! `<N more element(s)>` node that resumes where the cap cut off.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use ensign_swank::types::{
    DebugLocation, DebugStackFrame, DebugStackLocal, DebugValue, DebugValueKind,
    INVALID_OBJECT_ID,
};
use ensign_swank::Rpc;
use tokio::sync::OnceCell;

use crate::error::DebugError;

/// Presentation knobs for inspection.
#[derive(Debug, Clone)]
pub struct InspectSettings {
    /// How many collection elements to show before continuing.
    /// Zero means unlimited.
    pub max_collection_elements: usize,
    /// Append the value's class name to labels.
    pub show_class: bool,
}

impl Default for InspectSettings {
    fn default() -> Self {
        InspectSettings {
            max_collection_elements: 50,
            show_class: false,
        }
    }
}

/// Everything a tree needs to fetch on demand.
#[derive(Clone)]
pub struct InspectCtx {
    pub rpc: Rpc,
    pub settings: InspectSettings,
    /// The suspended thread the tree was built against.
    pub thread_id: i64,
}

/// What a node is, and how to resolve it further.
pub enum NodeKind {
    /// A value with no structure to descend into.
    Leaf,
    /// A value reachable at a location; structure fetched on expand.
    Object { location: DebugLocation },
    /// A window into an array, starting at element `start`.
    Array { location: DebugLocation, start: i64 },
    /// A stack frame; children are `this` and the locals.
    Frame {
        frame_index: i64,
        this_object_id: i64,
        locals: Vec<DebugStackLocal>,
    },
}

pub struct InspectNode {
    label: String,
    kind: NodeKind,
    this: Weak<InspectNode>,
    parent: Weak<InspectNode>,
    expanded: AtomicBool,
    children: OnceCell<Vec<Arc<InspectNode>>>,
    description: OnceCell<String>,
}

impl InspectNode {
    fn build(
        label: String,
        kind: NodeKind,
        parent: Weak<InspectNode>,
        expanded: bool,
    ) -> Arc<InspectNode> {
        Arc::new_cyclic(|this| InspectNode {
            label,
            kind,
            this: this.clone(),
            parent,
            expanded: AtomicBool::new(expanded),
            children: OnceCell::new(),
            description: OnceCell::new(),
        })
    }

    fn child(&self, label: String, kind: NodeKind) -> Arc<InspectNode> {
        Self::build(label, kind, self.this.clone(), false)
    }

    /// Root a tree at a stack frame.
    pub fn frame_root(frame: &DebugStackFrame) -> Arc<InspectNode> {
        let label = format!(
            "{}.{} ({}:{})",
            frame.class_name,
            frame.method_name,
            frame.source_position.file_name,
            frame.source_position.line
        );
        Self::build(
            label,
            NodeKind::Frame {
                frame_index: frame.index,
                this_object_id: frame.this_object_id,
                locals: frame.locals.clone(),
            },
            Weak::new(),
            true,
        )
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<Arc<InspectNode>> {
        self.parent.upgrade()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded.load(Ordering::SeqCst)
    }

    pub fn set_expanded(&self, expanded: bool) {
        self.expanded.store(expanded, Ordering::SeqCst);
    }

    /// Flip expansion; returns the new state.
    pub fn toggle_expanded(&self) -> bool {
        !self.expanded.fetch_xor(true, Ordering::SeqCst)
    }

    /// The node's children, fetched from the server on first call and
    /// memoized after that.
    pub async fn children(&self, ctx: &InspectCtx) -> Result<&[Arc<InspectNode>], DebugError> {
        let children = self
            .children
            .get_or_try_init(|| self.fetch_children(ctx))
            .await?;
        Ok(children)
    }

    async fn fetch_children(&self, ctx: &InspectCtx) -> Result<Vec<Arc<InspectNode>>, DebugError> {
        match &self.kind {
            NodeKind::Leaf => Ok(Vec::new()),
            NodeKind::Frame {
                frame_index,
                this_object_id,
                locals,
            } => {
                let mut out = Vec::new();
                if *this_object_id != INVALID_OBJECT_ID {
                    out.push(self.child(
                        "this".to_string(),
                        NodeKind::Object {
                            location: DebugLocation::Reference {
                                object_id: *this_object_id,
                            },
                        },
                    ));
                }
                for local in locals {
                    let label = if ctx.settings.show_class {
                        format!("{}: {} ({})", local.name, local.summary, local.type_name)
                    } else {
                        format!("{}: {}", local.name, local.summary)
                    };
                    out.push(self.child(
                        label,
                        NodeKind::Object {
                            location: DebugLocation::Slot {
                                thread_id: ctx.thread_id,
                                frame: *frame_index,
                                offset: local.index,
                            },
                        },
                    ));
                }
                Ok(out)
            }
            NodeKind::Object { location } => match ctx.rpc.debug_value(location).await? {
                Some(value) => Ok(self.value_children(&ctx.settings, &value, 0)),
                None => Ok(Vec::new()),
            },
            NodeKind::Array { location, start } => match ctx.rpc.debug_value(location).await? {
                Some(value) => Ok(self.value_children(&ctx.settings, &value, *start)),
                None => Ok(Vec::new()),
            },
        }
    }

    fn value_children(
        &self,
        settings: &InspectSettings,
        value: &DebugValue,
        start: i64,
    ) -> Vec<Arc<InspectNode>> {
        match value.kind {
            DebugValueKind::Obj => {
                let object_id = match value.object_id {
                    Some(id) => id,
                    None => return Vec::new(),
                };
                value
                    .fields
                    .iter()
                    .map(|field| {
                        let summary = field.summary.as_deref().unwrap_or("?");
                        let label = if settings.show_class {
                            format!("{}: {} ({})", field.name, summary, field.type_name)
                        } else {
                            format!("{}: {}", field.name, summary)
                        };
                        self.child(
                            label,
                            NodeKind::Object {
                                location: DebugLocation::Field {
                                    object_id,
                                    field: field.name.clone(),
                                },
                            },
                        )
                    })
                    .collect()
            }
            DebugValueKind::Arr => {
                let object_id = match value.object_id {
                    Some(id) => id,
                    None => return Vec::new(),
                };
                let length = value.length.unwrap_or(0);
                let cap = match settings.max_collection_elements {
                    0 => i64::MAX,
                    n => n as i64,
                };
                let end = length.min(start.saturating_add(cap));
                let mut out: Vec<Arc<InspectNode>> = (start..end)
                    .map(|index| {
                        self.child(
                            format!("[{}]", index),
                            NodeKind::Object {
                                location: DebugLocation::Element { object_id, index },
                            },
                        )
                    })
                    .collect();
                if end < length {
                    out.push(self.child(
                        format!("<{} more element(s)>", length - end),
                        NodeKind::Array {
                            location: DebugLocation::Reference { object_id },
                            start: end,
                        },
                    ));
                }
                out
            }
            DebugValueKind::Null | DebugValueKind::Prim | DebugValueKind::Str => Vec::new(),
        }
    }

    /// A long-form rendering of the value, via the debuggee's own
    /// `toString`. Fetched once and memoized.
    pub async fn description(&self, ctx: &InspectCtx) -> Result<&str, DebugError> {
        let description = self
            .description
            .get_or_try_init(|| async {
                match &self.kind {
                    NodeKind::Object { location } | NodeKind::Array { location, .. } => {
                        Ok::<_, DebugError>(
                            ctx.rpc
                                .debug_to_string(ctx.thread_id, location)
                                .await?
                                .unwrap_or_else(|| self.label.clone()),
                        )
                    }
                    _ => Ok(self.label.clone()),
                }
            })
            .await?;
        Ok(description)
    }

    /// Flatten the tree into draw order: a node's children appear only
    /// when it is expanded and they have already been fetched.
    pub fn visible(&self) -> Vec<(usize, Arc<InspectNode>)> {
        let mut out = Vec::new();
        self.collect_visible(0, &mut out);
        out
    }

    fn collect_visible(&self, depth: usize, out: &mut Vec<(usize, Arc<InspectNode>)>) {
        if let Some(this) = self.this.upgrade() {
            out.push((depth, this));
        }
        if !self.is_expanded() {
            return;
        }
        if let Some(children) = self.children.get() {
            for child in children {
                child.collect_visible(depth + 1, out);
            }
        }
    }
}
