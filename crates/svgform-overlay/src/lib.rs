#![forbid(unsafe_code)]

//! Geometry resolution and overlay reconciliation for svgform fields (headless).
//!
//! After a document has been rendered, [`resolve_fields`] locates each scanned field in it and
//! measures its bounding rectangle; [`OverlaySynchronizer`] then keeps one live control per
//! placed field, diffing by field identity so that position-only and value-only changes never
//! rebuild controls.
//!
//! The rendered document and the view layer are capabilities injected by the host
//! ([`RenderedDocument`], [`OverlayView`]). [`SvgDocument`] and [`MemoryView`] are headless
//! implementations.

pub mod diagnostics;
pub mod document;
pub mod error;
pub mod geom;
pub mod host;
pub mod overlay;
pub mod resolve;
pub mod svg;

pub use diagnostics::Diagnostics;
pub use document::{AttributeQuery, ElementRef, RenderedDocument};
pub use error::{DocumentError, MeasureError, SvgDocumentError, SyncError, ViewError};
pub use geom::{Rect, Size};
pub use host::{FieldValues, FormHost, NoopHost};
pub use overlay::{
    ControlKind, ControlUpdate, DocumentChange, MemoryView, MountRequest, OverlayEffect,
    OverlayKey, OverlayOptions, OverlayPlan, OverlaySnapshot, OverlaySynchronizer, OverlayView,
    SyncReport, ViewOp, overlay_keys, plan_overlays,
};
pub use resolve::{LookupStrategy, ResolvedField, resolve_fields};
pub use svg::SvgDocument;
