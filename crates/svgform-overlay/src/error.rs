use crate::overlay::OverlayKey;

/// A rendered-document query that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("query {query} failed: {message}")]
pub struct DocumentError {
    pub query: String,
    pub message: String,
}

/// Geometry could not be read from an element.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeasureError {
    #[error("<{tag}> has an invalid `{attribute}` value {value:?}")]
    InvalidAttribute {
        tag: String,
        attribute: String,
        value: String,
    },

    #[error("unknown element reference #{0}")]
    UnknownElement(usize),
}

/// Failure reported by the view layer (or a host-supplied renderer) while mounting, updating
/// or unmounting an overlay.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ViewError {
    pub message: String,
}

impl ViewError {
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// A value change directed at an overlay that cannot accept it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("no overlay is mounted for {0}")]
    UnknownOverlay(OverlayKey),

    #[error("overlay {0} is not an input field")]
    NotAnInput(OverlayKey),
}

#[derive(Debug, thiserror::Error)]
pub enum SvgDocumentError {
    #[error("Failed to parse rendered document: {0}")]
    Parse(#[from] roxmltree::Error),
}
