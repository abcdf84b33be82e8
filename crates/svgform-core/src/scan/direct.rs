use super::AttributeGroup;
use crate::config::DocumentConventions;
use crate::mapping::FieldMapping;
use crate::matcher::match_indexed;
use crate::xml;
use roxmltree::Document;

/// Scans the top-level document. For each matched element, its own identifier becomes the
/// source element id; elements without one reuse the matched value.
pub(super) fn scan_direct(
    doc: &Document<'_>,
    groups: &[AttributeGroup<'_>],
    conventions: &DocumentConventions,
) -> Vec<FieldMapping> {
    let mut out = Vec::new();
    for group in groups {
        for node in xml::elements(doc.root_element()) {
            let Some(candidate) = xml::attribute(node, group.attribute) else {
                continue;
            };
            let Some(hit) = match_indexed(candidate, group.rules.iter().copied()) else {
                continue;
            };
            let source = xml::attribute(node, &conventions.id_attribute).unwrap_or(candidate);
            tracing::trace!(
                attribute = group.attribute,
                candidate,
                name = %hit.name,
                compiled_rule = hit.rule_index,
                "direct match"
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
    out
}
