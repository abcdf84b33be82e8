//! Overlay reconciliation.
//!
//! The synchronizer is split in two:
//! - [`plan_overlays`] is a pure diff of the previous overlay snapshot against the current
//!   resolved fields, producing an ordered effect list (destroys, then repositions, then creates).
//! - [`OverlaySynchronizer`] executes that plan through an injected [`OverlayView`] and owns
//!   every mounted control plus the input/output value state.

mod plan;
mod sync;
mod view;

pub use plan::{OverlayEffect, OverlayPlan, OverlaySnapshot, plan_overlays};
pub use sync::{DocumentChange, OverlayOptions, OverlaySynchronizer, SyncReport};
pub use view::{ControlKind, ControlUpdate, MemoryView, MountRequest, OverlayView, ViewOp};

use crate::resolve::ResolvedField;
use serde::Serialize;
use std::fmt;
use svgform_core::FieldType;

/// Stable identity of one overlay: the field's (type, name) plus an occurrence counter that
/// tells duplicate fields apart in mapping order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OverlayKey {
    pub field_type: FieldType,
    pub name: String,
    pub occurrence: usize,
}

impl OverlayKey {
    pub fn new(field_type: FieldType, name: impl Into<String>, occurrence: usize) -> Self {
        Self {
            field_type,
            name: name.into(),
            occurrence,
        }
    }
}

impl fmt::Display for OverlayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field_type, self.name)?;
        if self.occurrence > 0 {
            write!(f, "#{}", self.occurrence)?;
        }
        Ok(())
    }
}

/// One key per field, in field order.
pub fn overlay_keys(fields: &[ResolvedField]) -> Vec<OverlayKey> {
    let mut seen: rustc_hash::FxHashMap<(FieldType, &str), usize> = Default::default();
    fields
        .iter()
        .map(|field| {
            let slot = seen
                .entry((field.mapping.field_type, field.mapping.name.as_str()))
                .or_insert(0);
            let key = OverlayKey::new(field.mapping.field_type, &field.mapping.name, *slot);
            *slot += 1;
            key
        })
        .collect()
}
