use super::AttributeGroup;
use crate::config::DocumentConventions;
use crate::entities;
use crate::error::ScanError;
use crate::mapping::FieldMapping;
use crate::matcher::match_indexed;
use crate::xml;
use base64::Engine as _;
use roxmltree::{Document, Node};
use std::borrow::Cow;
use std::io::Read as _;

const MX_FILE: &str = "mxfile";
const MX_GRAPH_MODEL: &str = "mxGraphModel";
const MX_DIAGRAM: &str = "diagram";
/// Cell identifier inside the graph model; rendered elements reference it via the cell-id
/// attribute.
const MX_ID_ATTRIBUTE: &str = "id";

enum Page<'a, 'input> {
    Inline(Node<'a, 'input>),
    Compressed { page: usize, slot: usize },
}

/// Scans the secondary document embedded in the root element of `doc`.
///
/// Any page that cannot be decoded fails the whole pass.
pub(super) fn scan_embedded(
    doc: &Document<'_>,
    groups: &[AttributeGroup<'_>],
    conventions: &DocumentConventions,
) -> Result<Vec<FieldMapping>, ScanError> {
    let attribute = &conventions.embedded_document_attribute;
    let raw = xml::attribute(doc.root_element(), attribute)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ScanError::MissingEmbeddedDocument {
            attribute: attribute.clone(),
        })?;

    // The XML parser already removed one layer of escaping. Text that still does not start with
    // markup was escaped twice.
    let text = if raw.starts_with('<') {
        Cow::Borrowed(raw)
    } else {
        entities::decode_entities(raw)
    };
    let secondary = xml::parse(&text).map_err(|err| ScanError::MalformedEmbeddedDocument {
        message: err.to_string(),
    })?;

    let root = secondary.root_element();
    let mut pages: Vec<Page<'_, '_>> = Vec::new();
    let mut payloads: Vec<String> = Vec::new();
    match root.tag_name().name() {
        MX_GRAPH_MODEL => pages.push(Page::Inline(root)),
        MX_FILE => {
            for (page, diagram) in root
                .children()
                .filter(|n| n.has_tag_name(MX_DIAGRAM))
                .enumerate()
            {
                if diagram.children().any(|n| n.is_element()) {
                    pages.push(Page::Inline(diagram));
                    continue;
                }
                let payload = diagram.text().unwrap_or_default();
                if payload.trim().is_empty() {
                    continue;
                }
                let xml = inflate_page(payload)
                    .map_err(|message| ScanError::CompressedPage { page, message })?;
                pages.push(Page::Compressed {
                    page,
                    slot: payloads.len(),
                });
                payloads.push(xml);
            }
        }
        other => {
            return Err(ScanError::UnexpectedEmbeddedRoot {
                found: other.to_string(),
            });
        }
    }

    let decoded = payloads
        .iter()
        .map(|text| xml::parse(text))
        .collect::<Vec<_>>();

    let mut roots: Vec<Node<'_, '_>> = Vec::with_capacity(pages.len());
    for page in &pages {
        match page {
            Page::Inline(node) => roots.push(*node),
            Page::Compressed { page, slot } => match &decoded[*slot] {
                Ok(doc) => roots.push(doc.root_element()),
                Err(err) => {
                    return Err(ScanError::CompressedPage {
                        page: *page,
                        message: err.to_string(),
                    });
                }
            },
        }
    }

    let mut out = Vec::new();
    for group in groups {
        for page_root in &roots {
            for node in xml::elements(*page_root) {
                let Some(candidate) = xml::attribute(node, group.attribute) else {
                    continue;
                };
                let Some(hit) = match_indexed(candidate, group.rules.iter().copied()) else {
                    continue;
                };
                let source = node.attribute(MX_ID_ATTRIBUTE).unwrap_or(candidate);
                tracing::trace!(
                    attribute = group.attribute,
                    candidate,
                    cell = source,
                    name = %hit.name,
                    "embedded match"
                );
                out.push(FieldMapping {
                    data_id: candidate.to_string(),
                    name: hit.name,
                    source_element_id: source.to_string(),
                    field_type: hit.field_type,
                    matched_attribute: group.attribute.to_string(),
                });
            }
        }
    }
    Ok(out)
}

/// Compressed draw.io pages: base64 of raw DEFLATE of the URI-encoded `mxGraphModel`.
fn inflate_page(payload: &str) -> Result<String, String> {
    let compact: String = payload.split_whitespace().collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| format!("invalid base64: {err}"))?;
    let mut inflated = String::new();
    flate2::read::DeflateDecoder::new(bytes.as_slice())
        .read_to_string(&mut inflated)
        .map_err(|err| format!("invalid deflate stream: {err}"))?;
    Ok(entities::percent_decode(&inflated).into_owned())
}
