use super::{OverlayKey, overlay_keys};
use crate::geom::Rect;
use crate::resolve::ResolvedField;
use indexmap::IndexMap;
use svgform_core::{FieldIdentity, FieldMapping, same_field_set};

/// What was placed by the previous pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlaySnapshot {
    /// Ordered field identities of the previous pass, including fields without geometry.
    pub identity: Vec<FieldIdentity>,
    /// Overlays that exist after the previous pass, in field order.
    pub placed: IndexMap<OverlayKey, Rect>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEffect {
    Destroy(OverlayKey),
    Reposition {
        key: OverlayKey,
        rect: Rect,
    },
    Create {
        key: OverlayKey,
        /// Position of the field in the resolved field list.
        index: usize,
        rect: Rect,
    },
}

impl OverlayEffect {
    pub fn key(&self) -> &OverlayKey {
        match self {
            Self::Destroy(key) | Self::Reposition { key, .. } | Self::Create { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPlan {
    /// True when every previous overlay is torn down and the set is built from scratch.
    pub rebuild: bool,
    /// Destroys first, then repositions, then creates.
    pub effects: Vec<OverlayEffect>,
    pub next: OverlaySnapshot,
}

impl OverlayPlan {
    pub fn is_noop(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Diffs `previous` against the current `fields`.
///
/// A full rebuild happens only when the rendered document was replaced or the ordered identity
/// list changed. Otherwise existing overlays keep their identity: moved ones are repositioned,
/// ones that lost geometry are destroyed and ones that gained geometry are created.
pub fn plan_overlays(
    previous: &OverlaySnapshot,
    fields: &[ResolvedField],
    document_replaced: bool,
) -> OverlayPlan {
    let identity: Vec<FieldIdentity> = fields
        .iter()
        .map(|f| FieldMapping::identity(&f.mapping))
        .collect();
    let keys = overlay_keys(fields);
    let rebuild = document_replaced || !same_field_set(&previous.identity, &identity);

    let mut destroys = Vec::new();
    let mut repositions = Vec::new();
    let mut creates = Vec::new();
    let mut placed = IndexMap::with_capacity(fields.len());

    if rebuild {
        destroys.extend(previous.placed.keys().cloned().map(OverlayEffect::Destroy));
    } else {
        // Keys derive from identity, so this only matters for snapshots built by hand.
        destroys.extend(
            previous
                .placed
                .keys()
                .filter(|k| !keys.contains(k))
                .cloned()
                .map(OverlayEffect::Destroy),
        );
    }

    for (index, (key, field)) in keys.into_iter().zip(fields).enumerate() {
        let before = if rebuild {
            None
        } else {
            previous.placed.get(&key).copied()
        };
        match (before, field.rect) {
            (Some(old), Some(rect)) => {
                if old != rect {
                    repositions.push(OverlayEffect::Reposition {
                        key: key.clone(),
                        rect,
                    });
                }
                placed.insert(key, rect);
            }
            (Some(_), None) => destroys.push(OverlayEffect::Destroy(key)),
            (None, Some(rect)) => {
                creates.push(OverlayEffect::Create {
                    key: key.clone(),
                    index,
                    rect,
                });
                placed.insert(key, rect);
            }
            (None, None) => {}
        }
    }

    let mut effects = destroys;
    effects.append(&mut repositions);
    effects.append(&mut creates);

    OverlayPlan {
        rebuild,
        effects,
        next: OverlaySnapshot { identity, placed },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svgform_core::FieldType;

    fn field(name: &str, field_type: FieldType, rect: Option<Rect>) -> ResolvedField {
        let prefix = match field_type {
            FieldType::Input => "input-",
            FieldType::Output => "output-",
        };
        ResolvedField {
            mapping: FieldMapping {
                data_id: format!("{prefix}{name}"),
                name: name.to_string(),
                source_element_id: format!("{prefix}{name}"),
                field_type,
                matched_attribute: "id".to_string(),
            },
            rect,
            resolved_by: None,
        }
    }

    fn r(x: f64) -> Option<Rect> {
        Some(Rect::new(x, 0.0, 10.0, 10.0))
    }

    #[test]
    fn first_pass_creates_every_placed_field() {
        let fields = vec![
            field("a", FieldType::Input, r(0.0)),
            field("b", FieldType::Input, None),
            field("sum", FieldType::Output, r(20.0)),
        ];
        let plan = plan_overlays(&OverlaySnapshot::default(), &fields, false);
        assert!(plan.rebuild);
        assert_eq!(
            plan.effects,
            vec![
                OverlayEffect::Create {
                    key: OverlayKey::new(FieldType::Input, "a", 0),
                    index: 0,
                    rect: Rect::new(0.0, 0.0, 10.0, 10.0),
                },
                OverlayEffect::Create {
                    key: OverlayKey::new(FieldType::Output, "sum", 0),
                    index: 2,
                    rect: Rect::new(20.0, 0.0, 10.0, 10.0),
                },
            ]
        );
        assert_eq!(plan.next.identity.len(), 3);
        assert_eq!(plan.next.placed.len(), 2);
    }

    #[test]
    fn rect_change_only_repositions_that_field() {
        let before = vec![
            field("a", FieldType::Input, r(0.0)),
            field("sum", FieldType::Output, r(20.0)),
        ];
        let first = plan_overlays(&OverlaySnapshot::default(), &before, false);

        let after = vec![
            field("a", FieldType::Input, r(5.0)),
            field("sum", FieldType::Output, r(20.0)),
        ];
        let plan = plan_overlays(&first.next, &after, false);
        assert!(!plan.rebuild);
        assert_eq!(
            plan.effects,
            vec![OverlayEffect::Reposition {
                key: OverlayKey::new(FieldType::Input, "a", 0),
                rect: Rect::new(5.0, 0.0, 10.0, 10.0),
            }]
        );
        assert_eq!(plan.next.identity, first.next.identity);
    }

    #[test]
    fn unchanged_pass_is_a_noop() {
        let fields = vec![field("a", FieldType::Input, r(0.0))];
        let first = plan_overlays(&OverlaySnapshot::default(), &fields, false);
        let plan = plan_overlays(&first.next, &fields, false);
        assert!(!plan.rebuild);
        assert!(plan.is_noop());
    }

    #[test]
    fn identity_change_tears_down_before_creating() {
        let first = plan_overlays(
            &OverlaySnapshot::default(),
            &[
                field("a", FieldType::Input, r(0.0)),
                field("b", FieldType::Input, r(10.0)),
            ],
            false,
        );
        let plan = plan_overlays(
            &first.next,
            &[
                field("a", FieldType::Input, r(0.0)),
                field("c", FieldType::Input, r(10.0)),
            ],
            false,
        );
        assert!(plan.rebuild);
        let kinds: Vec<_> = plan
            .effects
            .iter()
            .map(|e| match e {
                OverlayEffect::Destroy(k) => format!("destroy {k}"),
                OverlayEffect::Reposition { key, .. } => format!("move {key}"),
                OverlayEffect::Create { key, .. } => format!("create {key}"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "destroy input:a",
                "destroy input:b",
                "create input:a",
                "create input:c"
            ]
        );
    }

    #[test]
    fn document_replacement_forces_rebuild() {
        let fields = vec![field("a", FieldType::Input, r(0.0))];
        let first = plan_overlays(&OverlaySnapshot::default(), &fields, false);
        let plan = plan_overlays(&first.next, &fields, true);
        assert!(plan.rebuild);
        assert_eq!(plan.effects.len(), 2);
    }

    #[test]
    fn losing_geometry_destroys_and_regaining_recreates() {
        let first = plan_overlays(
            &OverlaySnapshot::default(),
            &[field("a", FieldType::Input, r(0.0))],
            false,
        );
        let lost = plan_overlays(&first.next, &[field("a", FieldType::Input, None)], false);
        assert!(!lost.rebuild);
        assert_eq!(
            lost.effects,
            vec![OverlayEffect::Destroy(OverlayKey::new(FieldType::Input, "a", 0))]
        );
        let back = plan_overlays(&lost.next, &[field("a", FieldType::Input, r(1.0))], false);
        assert!(matches!(back.effects.as_slice(), [OverlayEffect::Create { .. }]));
    }

    #[test]
    fn duplicate_fields_get_distinct_keys() {
        let plan = plan_overlays(
            &OverlaySnapshot::default(),
            &[
                field("qty", FieldType::Input, r(0.0)),
                field("qty", FieldType::Input, r(30.0)),
            ],
            false,
        );
        let keys: Vec<String> = plan.next.placed.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["input:qty", "input:qty#1"]);
    }
}
