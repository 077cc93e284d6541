//! Single-field conditions: an operator and the value it compares against

use super::{FilterError, FilterResult};
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::str::FromStr;
use tracing::warn;

/// Separator of the compact percentage form, e.g. `"<=//80.0"`
const COMPACT_SEPARATOR: &str = "//";

/// Delimiter marking a condition value as a regular expression
const REGEX_DELIMITER: char = '#';

/// Comparison operator of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    Matches,
    /// Stands in for an entry that could not be interpreted; never satisfied
    Invalid,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Contains => "contains",
            Operator::Matches => "matches",
            Operator::Invalid => "invalid",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Ne => ordering != Ordering::Equal,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Le => ordering != Ordering::Greater,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Ge => ordering != Ordering::Less,
            Operator::Contains | Operator::Matches | Operator::Invalid => false,
        }
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            "contains" => Ok(Operator::Contains),
            "matches" => Ok(Operator::Matches),
            other => Err(FilterError::UnknownOperator(other.to_string())),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A compiled condition on one value.
///
/// Evaluation never fails: a value of the wrong type simply does not
/// satisfy the condition, and neither does an entry that could not be
/// interpreted.
#[derive(Debug, Clone)]
pub struct Condition {
    operator: Operator,
    value: Value,
    regex: Option<Regex>,
}

/// The pattern inside `#...#`, if the value is regex-delimited
fn regex_pattern(value: &Value) -> Option<&str> {
    let s = value.as_str()?;
    if s.len() >= 2 && s.starts_with(REGEX_DELIMITER) && s.ends_with(REGEX_DELIMITER) {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

fn compile(pattern: &str) -> FilterResult<Regex> {
    Regex::new(pattern).map_err(|source| FilterError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

impl Condition {
    /// Build a condition. A `#...#` value always yields `matches`.
    pub fn new(operator: Operator, value: Value) -> FilterResult<Self> {
        if let Some(pattern) = regex_pattern(&value) {
            let regex = compile(pattern)?;
            return Ok(Self {
                operator: Operator::Matches,
                value,
                regex: Some(regex),
            });
        }

        let regex = match operator {
            Operator::Matches => match value.as_str() {
                Some(pattern) => Some(compile(pattern)?),
                None => {
                    return Err(FilterError::InvalidCondition(format!(
                        "matches needs a string pattern, got {}",
                        value
                    )))
                }
            },
            _ => None,
        };

        Ok(Self {
            operator,
            value,
            regex,
        })
    }

    /// Build a condition from an operator keyword.
    ///
    /// An empty keyword is accepted only for a `#...#` value.
    pub fn parse(operator: &str, value: Value) -> FilterResult<Self> {
        if operator.trim().is_empty() && regex_pattern(&value).is_some() {
            return Self::new(Operator::Matches, value);
        }
        Self::new(operator.parse()?, value)
    }

    /// Equality with the given value
    pub fn equals(value: Value) -> FilterResult<Self> {
        Self::new(Operator::Eq, value)
    }

    /// A condition nothing satisfies, keeping the entry it was read from
    pub fn unsatisfiable(entry: Value) -> Self {
        Self {
            operator: Operator::Invalid,
            value: entry,
            regex: None,
        }
    }

    /// Interpret a filter-file entry, degrading an unusable one.
    ///
    /// An unknown operator, a bad regex or a malformed entry is logged and
    /// yields an unsatisfiable condition, so the rest of the file still
    /// applies.
    pub fn from_value(value: &Value) -> Self {
        Self::try_from_value(value).unwrap_or_else(|e| {
            warn!(entry = %value, error = %e, "filter condition will never be satisfied");
            Self::unsatisfiable(value.clone())
        })
    }

    /// Interpret a filter-file entry.
    ///
    /// Accepts `{operator, value}` mappings, the compact `"<op>//<number>"`
    /// string and bare scalars (equality, or `matches` for `#...#`).
    pub fn try_from_value(value: &Value) -> FilterResult<Self> {
        match value {
            Value::Object(map) => {
                let operand = map.get("value").cloned().ok_or_else(|| {
                    FilterError::InvalidCondition(format!("condition without value: {}", value))
                })?;
                match map.get("operator") {
                    None | Some(Value::Null) => Self::equals(operand),
                    Some(Value::String(op)) => Self::parse(op, operand),
                    Some(other) => Err(FilterError::UnknownOperator(other.to_string())),
                }
            }
            Value::Array(_) => Err(FilterError::InvalidCondition(format!(
                "expected a condition, got a sequence: {}",
                value
            ))),
            Value::String(s) => match Self::parse_compact(s) {
                Some(result) => result,
                None => Self::equals(value.clone()),
            },
            scalar => Self::equals(scalar.clone()),
        }
    }

    /// Parse `"<op>//<number>"`; `None` if the string is not in that form
    fn parse_compact(s: &str) -> Option<FilterResult<Self>> {
        if regex_pattern(&Value::String(s.to_string())).is_some() {
            return None;
        }
        let (op, number) = s.split_once(COMPACT_SEPARATOR)?;
        let number: f64 = number.trim().parse().ok()?;
        let number = serde_json::Number::from_f64(number)?;
        Some(Self::parse(op, Value::Number(number)))
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_satisfiable(&self) -> bool {
        self.operator != Operator::Invalid
    }

    /// Evaluate against a record field.
    ///
    /// Integer fields compare against the value coerced to an integer,
    /// float fields against the value coerced to a float; any other field
    /// only supports `==`/`!=` (raw equality), `contains` and `matches`.
    pub fn evaluate(&self, field: &Value) -> bool {
        match self.operator {
            Operator::Invalid => false,
            Operator::Matches => self.is_match(field),
            Operator::Contains => match (field, &self.value) {
                (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
                _ => false,
            },
            op => match self.numeric_ordering(field) {
                Some(ordering) => op.accepts(ordering),
                None if field.is_number() => false,
                None => match op {
                    Operator::Eq => field == &self.value,
                    Operator::Ne => field != &self.value,
                    _ => false,
                },
            },
        }
    }

    /// Evaluate against a language percentage, always compared as a float
    pub fn evaluate_percentage(&self, percentage: f64) -> bool {
        match self.operator {
            Operator::Contains | Operator::Invalid => false,
            Operator::Matches => self
                .regex
                .as_ref()
                .is_some_and(|re| re.is_match(&percentage.to_string())),
            op => as_f64(&self.value)
                .and_then(|target| percentage.partial_cmp(&target))
                .is_some_and(|ordering| op.accepts(ordering)),
        }
    }

    fn is_match(&self, field: &Value) -> bool {
        let Some(ref regex) = self.regex else {
            return false;
        };
        match field {
            Value::String(s) => regex.is_match(s),
            Value::Number(n) => regex.is_match(&n.to_string()),
            Value::Bool(b) => regex.is_match(&b.to_string()),
            _ => false,
        }
    }

    /// Ordering of a numeric field against the coerced value
    fn numeric_ordering(&self, field: &Value) -> Option<Ordering> {
        let Value::Number(n) = field else {
            return None;
        };
        if let Some(lhs) = n.as_i64() {
            return as_i64(&self.value).map(|rhs| lhs.cmp(&rhs));
        }
        let lhs = n.as_f64()?;
        as_f64(&self.value).and_then(|rhs| lhs.partial_cmp(&rhs))
    }
}

/// Coerce to an integer, truncating floats
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
