//! First-rule-wins evaluation of a candidate string against an ordered rule list.
//!
//! There is no scoring and no longest-match preference: callers express precedence purely by
//! rule order.

use crate::rules::{FieldType, MatchRule};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    pub field_type: FieldType,
    pub name: String,
    /// Index of the winning rule in the slice passed to [`match_candidate`]. For
    /// [`crate::CompiledRules::rules`] that is the compiled position, which skips invalid rules
    /// and so can differ from the `rules[<index>]` numbering of [`crate::RuleProblem`].
    pub rule_index: usize,
}

pub fn match_candidate(candidate: &str, rules: &[MatchRule]) -> Option<FieldMatch> {
    match_indexed(candidate, rules.iter().enumerate())
}

/// Same as [`match_candidate`] over a pre-filtered rule subset that keeps original indices.
pub(crate) fn match_indexed<'r>(
    candidate: &str,
    rules: impl IntoIterator<Item = (usize, &'r MatchRule)>,
) -> Option<FieldMatch> {
    rules.into_iter().find_map(|(rule_index, rule)| {
        rule.extract(candidate).map(|name| FieldMatch {
            field_type: rule.field_type,
            name,
            rule_index,
        })
    })
}
