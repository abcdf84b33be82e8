//! Matching rules: the strongly-typed [`MatchRule`] used by the matcher, and the loose
//! [`RuleSpec`] shape accepted from configuration files.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Direction of a field: `input` controls feed the host, `output` controls display host values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Input,
    Output,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }

    /// Case-insensitive parse of `input` / `output`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "input" => Some(Self::Input),
            "output" => Some(Self::Output),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum MatchStrategy {
    /// Candidate must equal one of the members; the name is the candidate itself.
    Exact(Vec<String>),
    /// Candidate must start with the prefix; the name is the remainder.
    Prefix(String),
    /// Candidate must match the expression; the name is the first capture group when it
    /// captured something, otherwise the whole candidate.
    Pattern(Regex),
}

impl MatchStrategy {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Exact(_) => "ids",
            Self::Prefix(_) => "prefix",
            Self::Pattern(_) => "pattern",
        }
    }

    /// Returns the extracted field name when `candidate` satisfies this strategy.
    pub fn extract(&self, candidate: &str) -> Option<String> {
        match self {
            Self::Exact(ids) => ids
                .iter()
                .any(|id| id == candidate)
                .then(|| candidate.to_string()),
            Self::Prefix(prefix) => {
                if candidate.is_empty() {
                    return None;
                }
                candidate.strip_prefix(prefix.as_str()).map(str::to_string)
            }
            Self::Pattern(re) => {
                if candidate.is_empty() {
                    return None;
                }
                let caps = re.captures(candidate)?;
                let name = caps
                    .get(1)
                    .map(|m| m.as_str())
                    .filter(|s| !s.is_empty())
                    .unwrap_or(candidate);
                Some(name.to_string())
            }
        }
    }
}

/// A validated rule: one field type, one strategy, an optional attribute override.
#[derive(Debug, Clone)]
pub struct MatchRule {
    pub field_type: FieldType,
    /// Attribute to read candidates from. `None` means the dialect's default attribute.
    pub attribute: Option<String>,
    pub strategy: MatchStrategy,
}

impl MatchRule {
    pub fn exact<I, S>(field_type: FieldType, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field_type,
            attribute: None,
            strategy: MatchStrategy::Exact(ids.into_iter().map(Into::into).collect()),
        }
    }

    pub fn prefix(field_type: FieldType, prefix: impl Into<String>) -> Self {
        Self {
            field_type,
            attribute: None,
            strategy: MatchStrategy::Prefix(prefix.into()),
        }
    }

    pub fn pattern(field_type: FieldType, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            field_type,
            attribute: None,
            strategy: MatchStrategy::Pattern(Regex::new(pattern)?),
        })
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn target_attribute<'a>(&'a self, default: &'a str) -> &'a str {
        self.attribute.as_deref().unwrap_or(default)
    }

    pub fn extract(&self, candidate: &str) -> Option<String> {
        self.strategy.extract(candidate)
    }
}

/// Wire-level rule as it appears in JSON/YAML configuration.
///
/// Every field is kept as an untyped value so that a badly shaped rule produces a readable,
/// rule-indexed [`RuleProblem`] instead of failing deserialization of the whole document.
/// Unknown keys are ignored and `null` counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct RuleSpec {
    pub field_type: Option<Value>,
    pub attribute: Option<Value>,
    pub ids: Option<Value>,
    /// Alias of `ids`; setting both is a problem.
    pub exact: Option<Value>,
    pub prefix: Option<Value>,
    pub pattern: Option<Value>,
    /// The raw entry when it was not an object.
    pub malformed: Option<Value>,
}

impl From<Value> for RuleSpec {
    fn from(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self {
                malformed: Some(value),
                ..Self::default()
            };
        };
        let mut take = |key: &str| map.remove(key).filter(|v| !v.is_null());
        Self {
            field_type: take("type"),
            attribute: take("attribute"),
            ids: take("ids"),
            exact: take("exact"),
            prefix: take("prefix"),
            pattern: take("pattern"),
            malformed: None,
        }
    }
}

impl From<RuleSpec> for Value {
    fn from(spec: RuleSpec) -> Self {
        if let Some(raw) = spec.malformed {
            return raw;
        }
        let mut map = serde_json::Map::new();
        for (key, value) in [
            ("type", spec.field_type),
            ("attribute", spec.attribute),
            ("ids", spec.ids),
            ("exact", spec.exact),
            ("prefix", spec.prefix),
            ("pattern", spec.pattern),
        ] {
            if let Some(value) = value {
                map.insert(key.to_string(), value);
            }
        }
        Value::Object(map)
    }
}

impl RuleSpec {
    pub fn ids<I, S>(field_type: FieldType, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field_type: Some(Value::String(field_type.as_str().to_string())),
            ids: Some(Value::Array(
                ids.into_iter().map(|s| Value::String(s.into())).collect(),
            )),
            ..Self::default()
        }
    }

    pub fn prefix(field_type: FieldType, prefix: impl Into<String>) -> Self {
        Self {
            field_type: Some(Value::String(field_type.as_str().to_string())),
            prefix: Some(Value::String(prefix.into())),
            ..Self::default()
        }
    }

    pub fn pattern(field_type: FieldType, pattern: impl Into<String>) -> Self {
        Self {
            field_type: Some(Value::String(field_type.as_str().to_string())),
            pattern: Some(Value::String(pattern.into())),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(Value::String(attribute.into()));
        self
    }

    fn compile(&self, index: usize) -> Result<MatchRule, Vec<RuleProblem>> {
        let problem = |message: String| RuleProblem { index, message };
        if self.malformed.is_some() {
            return Err(vec![problem("rule must be an object".to_string())]);
        }
        let mut problems = Vec::new();

        let field_type = match &self.field_type {
            None => {
                problems.push(problem(
                    "missing `type` (expected \"input\" or \"output\")".to_string(),
                ));
                None
            }
            Some(v) => {
                let parsed = v.as_str().and_then(FieldType::parse);
                if parsed.is_none() {
                    problems.push(problem(format!(
                        "invalid `type` {v} (expected \"input\" or \"output\")"
                    )));
                }
                parsed
            }
        };

        let attribute = match &self.attribute {
            None => None,
            Some(Value::String(s)) if s.trim().is_empty() => {
                problems.push(problem("`attribute` must not be empty".to_string()));
                None
            }
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(_) => {
                problems.push(problem("`attribute` must be a string".to_string()));
                None
            }
        };

        let set: Vec<&'static str> = [
            ("ids", self.ids.is_some()),
            ("exact", self.exact.is_some()),
            ("prefix", self.prefix.is_some()),
            ("pattern", self.pattern.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect();

        let strategy = match set.as_slice() {
            [] => {
                problems.push(problem(
                    "must set exactly one of `ids`, `prefix` or `pattern` (none set)".to_string(),
                ));
                None
            }
            [_] => self.compile_strategy(&mut problems, index),
            many => {
                let found = many
                    .iter()
                    .map(|s| format!("`{s}`"))
                    .collect::<Vec<_>>()
                    .join(", ");
                problems.push(problem(format!(
                    "must set exactly one of `ids`, `prefix` or `pattern` (found {found})"
                )));
                None
            }
        };

        match (field_type, strategy) {
            (Some(field_type), Some(strategy)) if problems.is_empty() => Ok(MatchRule {
                field_type,
                attribute,
                strategy,
            }),
            _ => Err(problems),
        }
    }

    fn compile_strategy(
        &self,
        problems: &mut Vec<RuleProblem>,
        index: usize,
    ) -> Option<MatchStrategy> {
        let mut push = |message: String| problems.push(RuleProblem { index, message });

        let ids = match (&self.ids, &self.exact) {
            (Some(v), _) => Some(("ids", v)),
            (None, Some(v)) => Some(("exact", v)),
            (None, None) => None,
        };
        if let Some((key, ids)) = ids {
            let Some(items) = ids.as_array() else {
                push(format!("`{key}` must be an array of strings"));
                return None;
            };
            if items.is_empty() {
                push(format!("`{key}` must not be empty"));
                return None;
            }
            let mut out = Vec::with_capacity(items.len());
            let mut ok = true;
            for (i, item) in items.iter().enumerate() {
                match item.as_str() {
                    Some(s) => out.push(s.to_string()),
                    None => {
                        push(format!("`{key}[{i}]` must be a string (found {item})"));
                        ok = false;
                    }
                }
            }
            return ok.then_some(MatchStrategy::Exact(out));
        }

        if let Some(prefix) = &self.prefix {
            let Some(prefix) = prefix.as_str() else {
                push("`prefix` must be a string".to_string());
                return None;
            };
            return Some(MatchStrategy::Prefix(prefix.to_string()));
        }

        let pattern = self.pattern.as_ref()?;
        let Some(pattern) = pattern.as_str() else {
            push("`pattern` must be a string".to_string());
            return None;
        };
        match Regex::new(pattern) {
            Ok(re) => Some(MatchStrategy::Pattern(re)),
            Err(err) => {
                push(format!("invalid `pattern`: {err}"));
                None
            }
        }
    }
}

/// One human-readable problem with the rule at `index` (zero-based declaration order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleProblem {
    pub index: usize,
    pub message: String,
}

impl fmt::Display for RuleProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rules[{}]: {}", self.index, self.message)
    }
}

/// Returns every problem found in `specs`. Never fails; an empty list means all rules are valid.
pub fn validate_rules(specs: &[RuleSpec]) -> Vec<RuleProblem> {
    specs
        .iter()
        .enumerate()
        .filter_map(|(index, spec)| spec.compile(index).err())
        .flatten()
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    /// Valid rules, in declaration order.
    pub rules: Vec<MatchRule>,
    pub problems: Vec<RuleProblem>,
}

impl CompiledRules {
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Validates and compiles `specs`. Invalid rules are dropped whole and reported in `problems`.
pub fn compile_rules(specs: &[RuleSpec]) -> CompiledRules {
    let mut out = CompiledRules::default();
    for (index, spec) in specs.iter().enumerate() {
        match spec.compile(index) {
            Ok(rule) => out.rules.push(rule),
            Err(problems) => out.problems.extend(problems),
        }
    }
    out
}
