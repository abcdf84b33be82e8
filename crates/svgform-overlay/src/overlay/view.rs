use super::OverlayKey;
use crate::error::ViewError;
use crate::geom::Rect;
use crate::resolve::ResolvedField;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde_json::Value;

/// Which control a mount request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    /// The host-supplied renderer for the field's type.
    Custom,
    /// The built-in control; the fallback when a custom renderer fails.
    Default,
}

#[derive(Debug, Clone, Copy)]
pub struct MountRequest<'a> {
    pub key: &'a OverlayKey,
    pub field: &'a ResolvedField,
    pub rect: Rect,
    /// Current value: host input state for inputs, computed values for outputs.
    pub value: Option<&'a Value>,
    pub control: ControlKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlUpdate<'a> {
    Position(Rect),
    Value(Option<&'a Value>),
}

/// Mount primitives of the view layer hosting the overlays.
///
/// The synchronizer owns every handle it receives and is the only caller of `update` and
/// `unmount` for it.
pub trait OverlayView {
    type Handle;

    fn mount(&mut self, request: MountRequest<'_>) -> Result<Self::Handle, ViewError>;

    fn update(&mut self, handle: &Self::Handle, update: ControlUpdate<'_>) -> Result<(), ViewError>;

    fn unmount(&mut self, handle: Self::Handle) -> Result<(), ViewError>;
}

/// A control living in a [`MemoryView`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryControl {
    pub key: OverlayKey,
    pub control: ControlKind,
    pub rect: Rect,
    pub value: Option<Value>,
}

/// Operations applied to a [`MemoryView`], in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOp {
    Mount {
        handle: u64,
        key: OverlayKey,
        control: ControlKind,
    },
    Position {
        handle: u64,
        rect: Rect,
    },
    Value {
        handle: u64,
        value: Option<Value>,
    },
    Unmount {
        handle: u64,
    },
}

/// Headless view that keeps controls in memory. Used by the CLI and by tests; custom renderer
/// failures can be injected per field name.
#[derive(Debug, Default)]
pub struct MemoryView {
    next_handle: u64,
    controls: IndexMap<u64, MemoryControl>,
    log: Vec<ViewOp>,
    failing_mounts: FxHashSet<String>,
    failing_updates: FxHashSet<String>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom controls for `name` fail to mount.
    pub fn with_failing_renderer(mut self, name: impl Into<String>) -> Self {
        self.failing_mounts.insert(name.into());
        self
    }

    /// Custom controls for `name` mount, but fail on value updates.
    pub fn with_failing_updates(mut self, name: impl Into<String>) -> Self {
        self.failing_updates.insert(name.into());
        self
    }

    pub fn controls(&self) -> impl Iterator<Item = (u64, &MemoryControl)> {
        self.controls.iter().map(|(h, c)| (*h, c))
    }

    pub fn control(&self, key: &OverlayKey) -> Option<(u64, &MemoryControl)> {
        self.controls().find(|(_, c)| &c.key == key)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn log(&self) -> &[ViewOp] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}

impl OverlayView for MemoryView {
    type Handle = u64;

    fn mount(&mut self, request: MountRequest<'_>) -> Result<u64, ViewError> {
        if request.control == ControlKind::Custom
            && self.failing_mounts.contains(&request.key.name)
        {
            return Err(ViewError::new(format!(
                "renderer for `{}` failed to mount",
                request.key.name
            )));
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.controls.insert(
            handle,
            MemoryControl {
                key: request.key.clone(),
                control: request.control,
                rect: request.rect,
                value: request.value.cloned(),
            },
        );
        self.log.push(ViewOp::Mount {
            handle,
            key: request.key.clone(),
            control: request.control,
        });
        Ok(handle)
    }

    fn update(&mut self, handle: &u64, update: ControlUpdate<'_>) -> Result<(), ViewError> {
        let Some(control) = self.controls.get_mut(handle) else {
            return Err(ViewError::new(format!("unknown control {handle}")));
        };
        match update {
            ControlUpdate::Position(rect) => {
                control.rect = rect;
                self.log.push(ViewOp::Position {
                    handle: *handle,
                    rect,
                });
            }
            ControlUpdate::Value(value) => {
                if control.control == ControlKind::Custom
                    && self.failing_updates.contains(&control.key.name)
                {
                    return Err(ViewError::new(format!(
                        "renderer for `{}` failed to update",
                        control.key.name
                    )));
                }
                control.value = value.cloned();
                self.log.push(ViewOp::Value {
                    handle: *handle,
                    value: value.cloned(),
                });
            }
        }
        Ok(())
    }

    fn unmount(&mut self, handle: u64) -> Result<(), ViewError> {
        if self.controls.shift_remove(&handle).is_none() {
            return Err(ViewError::new(format!("unknown control {handle}")));
        }
        self.log.push(ViewOp::Unmount { handle });
        Ok(())
    }
}
