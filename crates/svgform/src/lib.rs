#![forbid(unsafe_code)]

//! `svgform` binds input/output form fields onto SVG diagrams exported by diagramming tools.
//!
//! The pipeline:
//! 1. scan the document text for fields ([`scan`], re-exported from `svgform-core`)
//! 2. the host renders the document
//! 3. resolve each field's rectangle in the rendered document ([`overlay::resolve_fields`])
//! 4. keep one overlay control per placed field in sync ([`overlay::OverlaySynchronizer`])
//!
//! [`FormSession`] runs the whole pipeline; [`load`] covers the async document fetch.

pub use svgform_core::*;

pub mod overlay {
    pub use svgform_overlay::*;
}

pub mod load;
pub mod session;

pub use load::{DocumentFetcher, DocumentSource, FileFetcher, LoadError, load_document};
pub use session::{FormSession, SessionError};
