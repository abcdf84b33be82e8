//! Geometry resolution: one [`ResolvedField`] per [`FieldMapping`], in order.
//!
//! Lookup is a short strategy chain; the first step that finds an element wins. Query and
//! measurement failures are logged and degrade to `rect: None` for that one field.

use crate::document::{AttributeQuery, ElementRef, RenderedDocument};
use crate::geom::Rect;
use serde::{Deserialize, Serialize};
use svgform_core::{DocumentConventions, FieldMapping};

/// Which chain step located the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LookupStrategy {
    /// Identifier attribute equals `sourceElementId`.
    ElementId,
    /// Cell-id attribute equals `sourceElementId`.
    CellId,
    /// The matched attribute equals the raw `dataId`.
    MatchedAttribute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedField {
    #[serde(flatten)]
    pub mapping: FieldMapping,
    pub rect: Option<Rect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<LookupStrategy>,
}

impl ResolvedField {
    pub fn unresolved(mapping: FieldMapping) -> Self {
        Self {
            mapping,
            rect: None,
            resolved_by: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.rect.is_some()
    }
}

/// Resolves every mapping against `document`. Total: never fails, never drops a mapping.
pub fn resolve_fields<D>(
    document: &D,
    mappings: &[FieldMapping],
    conventions: &DocumentConventions,
) -> Vec<ResolvedField>
where
    D: RenderedDocument + ?Sized,
{
    let out: Vec<ResolvedField> = mappings
        .iter()
        .map(|mapping| resolve_one(document, mapping, conventions))
        .collect();
    tracing::debug!(
        fields = out.len(),
        resolved = out.iter().filter(|f| f.is_resolved()).count(),
        "geometry resolved"
    );
    out
}

fn resolve_one<D>(
    document: &D,
    mapping: &FieldMapping,
    conventions: &DocumentConventions,
) -> ResolvedField
where
    D: RenderedDocument + ?Sized,
{
    let Some((element, strategy)) = locate(document, mapping, conventions) else {
        tracing::trace!(field = %mapping.name, source = %mapping.source_element_id, "element not found");
        return ResolvedField::unresolved(mapping.clone());
    };

    let rect = match document.bounding_rect(element) {
        Ok(rect) => rect,
        Err(err) => {
            tracing::warn!(field = %mapping.name, error = %err, "failed to measure field element");
            None
        }
    };

    ResolvedField {
        mapping: mapping.clone(),
        rect,
        resolved_by: Some(strategy),
    }
}

fn locate<D>(
    document: &D,
    mapping: &FieldMapping,
    conventions: &DocumentConventions,
) -> Option<(ElementRef, LookupStrategy)>
where
    D: RenderedDocument + ?Sized,
{
    let mut steps: Vec<(AttributeQuery<'_>, LookupStrategy)> = vec![
        (
            AttributeQuery::new(&conventions.id_attribute, &mapping.source_element_id),
            LookupStrategy::ElementId,
        ),
        (
            AttributeQuery::new(&conventions.cell_id_attribute, &mapping.source_element_id),
            LookupStrategy::CellId,
        ),
    ];
    if mapping.matched_attribute != conventions.id_attribute {
        steps.push((
            AttributeQuery::new(&mapping.matched_attribute, &mapping.data_id),
            LookupStrategy::MatchedAttribute,
        ));
    }

    steps
        .into_iter()
        .filter(|(query, _)| !query.name.is_empty() && !query.value.is_empty())
        .find_map(|(query, strategy)| match document.find(&query) {
            Ok(found) => {
                tracing::trace!(%query, ?strategy, found = found.is_some(), "lookup");
                found.map(|element| (element, strategy))
            }
            Err(err) => {
                tracing::warn!(%query, error = %err, "element query failed");
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DocumentError, MeasureError};
    use crate::svg::SvgDocument;
    use svgform_core::FieldType;

    fn mapping(name: &str, data_id: &str, source: &str, attribute: &str) -> FieldMapping {
        FieldMapping {
            data_id: data_id.to_string(),
            name: name.to_string(),
            source_element_id: source.to_string(),
            field_type: FieldType::Input,
            matched_attribute: attribute.to_string(),
        }
    }

    const RENDERED: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">
      <rect id="input-a" x="0" y="0" width="10" height="10"/>
      <g data-cell-id="cell-7"><rect x="20" y="0" width="10" height="10"/></g>
      <rect class="field-total" x="40" y="0" width="10" height="10"/>
      <text id="output-label" x="0" y="50">label</text>
    </svg>"#;

    #[test]
    fn chain_prefers_id_then_cell_id_then_matched_attribute() {
        let doc = SvgDocument::parse(RENDERED).unwrap();
        let conventions = DocumentConventions::default();
        let fields = resolve_fields(
            &doc,
            &[
                mapping("a", "input-a", "input-a", "id"),
                mapping("email", "input-field-email", "cell-7", "external-id"),
                mapping("total", "field-total", "field-total", "class"),
            ],
            &conventions,
        );
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].resolved_by, Some(LookupStrategy::ElementId));
        assert_eq!(fields[0].rect, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(fields[1].resolved_by, Some(LookupStrategy::CellId));
        assert_eq!(fields[1].rect, Some(Rect::new(20.0, 0.0, 10.0, 10.0)));
        assert_eq!(fields[2].resolved_by, Some(LookupStrategy::MatchedAttribute));
        assert_eq!(fields[2].rect, Some(Rect::new(40.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn missing_element_is_null_and_keeps_order() {
        let doc = SvgDocument::parse(RENDERED).unwrap();
        let conventions = DocumentConventions::default();
        let fields = resolve_fields(
            &doc,
            &[
                mapping("ghost", "input-ghost", "input-ghost", "id"),
                mapping("a", "input-a", "input-a", "id"),
                mapping("label", "output-label", "output-label", "id"),
            ],
            &conventions,
        );
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].mapping.name, "ghost");
        assert_eq!(fields[0].rect, None);
        assert_eq!(fields[0].resolved_by, None);
        assert!(fields[1].is_resolved());
        // Found, but text has no measurable geometry.
        assert_eq!(fields[2].rect, None);
        assert_eq!(fields[2].resolved_by, Some(LookupStrategy::ElementId));
    }

    #[test]
    fn resolving_twice_is_identical() {
        let doc = SvgDocument::parse(RENDERED).unwrap();
        let conventions = DocumentConventions::default();
        let mappings = [
            mapping("a", "input-a", "input-a", "id"),
            mapping("email", "input-field-email", "cell-7", "external-id"),
        ];
        let first = resolve_fields(&doc, &mappings, &conventions);
        let second = resolve_fields(&doc, &mappings, &conventions);
        assert_eq!(first, second);
    }

    struct Flaky;

    impl RenderedDocument for Flaky {
        fn find(&self, query: &AttributeQuery<'_>) -> Result<Option<ElementRef>, DocumentError> {
            match query.value {
                "broken" => Err(DocumentError {
                    query: query.to_selector(),
                    message: "syntax error".to_string(),
                }),
                "unmeasurable" => Ok(Some(ElementRef(1))),
                _ => Ok(Some(ElementRef(0))),
            }
        }

        fn bounding_rect(&self, element: ElementRef) -> Result<Option<Rect>, MeasureError> {
            match element.0 {
                0 => Ok(Some(Rect::new(1.0, 2.0, 3.0, 4.0))),
                n => Err(MeasureError::UnknownElement(n)),
            }
        }
    }

    #[test]
    fn query_and_measure_failures_degrade_to_null() {
        let conventions = DocumentConventions::default();
        let fields = resolve_fields(
            &Flaky,
            &[
                mapping("x", "broken", "broken", "id"),
                mapping("y", "unmeasurable", "unmeasurable", "id"),
                mapping("z", "ok", "ok", "id"),
            ],
            &conventions,
        );
        assert_eq!(fields[0].rect, None);
        assert_eq!(fields[1].rect, None);
        assert_eq!(fields[2].rect, Some(Rect::new(1.0, 2.0, 3.0, 4.0)));
    }

    #[test]
    fn resolved_field_serializes_flat() {
        let field = ResolvedField {
            mapping: mapping("a", "input-a", "input-a", "id"),
            rect: Some(Rect::new(0.0, 0.0, 1.0, 1.0)),
            resolved_by: Some(LookupStrategy::ElementId),
        };
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["name"], "a");
        assert_eq!(value["sourceElementId"], "input-a");
        assert_eq!(value["type"], "input");
        assert_eq!(value["rect"]["width"], 1.0);
        assert_eq!(value["resolvedBy"], "elementId");
    }
}
