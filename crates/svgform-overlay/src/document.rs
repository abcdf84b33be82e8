//! The rendered-document capability consumed by the geometry resolver.
//!
//! Hosts that render into a real DOM implement [`RenderedDocument`] on top of their own query
//! and measurement primitives; [`crate::svg::SvgDocument`] is the headless implementation.

use crate::error::{DocumentError, MeasureError};
use crate::geom::{Rect, Size};
use std::fmt;

/// Opaque reference to an element of a rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(pub usize);

/// Literal attribute-equality query: the first element (document order) whose `name`
/// attribute equals `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeQuery<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

impl<'a> AttributeQuery<'a> {
    pub fn new(name: &'a str, value: &'a str) -> Self {
        Self { name, value }
    }

    /// Renders the query as a CSS attribute selector. Both the attribute name and the value are
    /// escaped, so ids containing quotes, brackets or colons stay literal.
    pub fn to_selector(&self) -> String {
        format!(
            "[{}=\"{}\"]",
            escape_identifier(self.name),
            escape_string(self.value)
        )
    }
}

impl fmt::Display for AttributeQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_selector())
    }
}

pub trait RenderedDocument {
    fn find(&self, query: &AttributeQuery<'_>) -> Result<Option<ElementRef>, DocumentError>;

    /// `Ok(None)` when the element has no measurable geometry.
    fn bounding_rect(&self, element: ElementRef) -> Result<Option<Rect>, MeasureError>;

    /// Pixel dimensions of the whole document, when known.
    fn dimensions(&self) -> Option<Size> {
        None
    }
}

impl<D: RenderedDocument + ?Sized> RenderedDocument for &D {
    fn find(&self, query: &AttributeQuery<'_>) -> Result<Option<ElementRef>, DocumentError> {
        (**self).find(query)
    }

    fn bounding_rect(&self, element: ElementRef) -> Result<Option<Rect>, MeasureError> {
        (**self).bounding_rect(element)
    }

    fn dimensions(&self) -> Option<Size> {
        (**self).dimensions()
    }
}

/// CSS identifier escaping (CSSOM `CSS.escape`).
pub fn escape_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let chars: Vec<char> = raw.chars().collect();
    for (i, &ch) in chars.iter().enumerate() {
        match ch {
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1f}' | '\u{7f}' => push_code_point(&mut out, ch),
            '0'..='9' if i == 0 || (i == 1 && chars[0] == '-') => push_code_point(&mut out, ch),
            '-' if i == 0 && chars.len() == 1 => out.push_str("\\-"),
            c if c as u32 >= 0x80 || c == '-' || c == '_' || c.is_ascii_alphanumeric() => {
                out.push(c)
            }
            c => {
                out.push('\\');
                out.push(c);
            }
        }
    }
    out
}

/// Escapes text for use inside a double-quoted CSS string.
pub fn escape_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    for ch in raw.chars() {
        match ch {
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1f}' | '\u{7f}' => push_code_point(&mut out, ch),
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}

fn push_code_point(out: &mut String, ch: char) {
    out.push_str(&format!("\\{:x} ", ch as u32));
}
