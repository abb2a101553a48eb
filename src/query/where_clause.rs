use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
        }
    }
}

/// One predicate form from the WHERE grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    Compare { op: CompareOp, value: String },
    IsNull,
    IsNotNull,
    Like { pattern: String, negated: bool },
    Between { low: String, high: String, negated: bool },
    InList { values: Vec<String>, negated: bool },
}

/// A single-column predicate. All comparisons are lexicographic over the
/// stored strings; numeric-looking columns therefore order numerically
/// only when zero-padded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhereCondition {
    pub column: String,
    pub predicate: Predicate,
}

impl WhereCondition {
    pub fn new(column: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            column: column.into(),
            predicate,
        }
    }

    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            column,
            Predicate::Compare {
                op: CompareOp::Eq,
                value: value.into(),
            },
        )
    }

    /// Evaluates the predicate against a stored value. Absence is null;
    /// the literal text "NULL" is normalized to null here as well.
    pub fn evaluate(&self, value: Option<&str>) -> bool {
        let value = value.filter(|v| !v.eq_ignore_ascii_case("NULL"));

        match &self.predicate {
            Predicate::Compare { op, value: rhs } => match value {
                None => matches!(op, CompareOp::NotEq),
                Some(v) => match op {
                    CompareOp::Eq => v == rhs.as_str(),
                    CompareOp::NotEq => v != rhs.as_str(),
                    CompareOp::Gt => v > rhs.as_str(),
                    CompareOp::GtEq => v >= rhs.as_str(),
                    CompareOp::Lt => v < rhs.as_str(),
                    CompareOp::LtEq => v <= rhs.as_str(),
                },
            },
            Predicate::IsNull => value.is_none(),
            Predicate::IsNotNull => value.is_some(),
            Predicate::Like { pattern, negated } => match value {
                None => *negated,
                Some(v) => matches_like_pattern(v, pattern) != *negated,
            },
            Predicate::Between { low, high, negated } => match value {
                None => *negated,
                Some(v) => (v >= low.as_str() && v <= high.as_str()) != *negated,
            },
            Predicate::InList { values, negated } => match value {
                None => *negated,
                Some(v) => values.iter().any(|candidate| candidate == v) != *negated,
            },
        }
    }
}

impl fmt::Display for WhereCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.predicate {
            Predicate::Compare { op, value } => {
                write!(f, "{} {} {}", self.column, op.symbol(), value)
            }
            Predicate::IsNull => write!(f, "{} IS NULL", self.column),
            Predicate::IsNotNull => write!(f, "{} IS NOT NULL", self.column),
            Predicate::Like { pattern, negated } => write!(
                f,
                "{} {}LIKE {}",
                self.column,
                if *negated { "NOT " } else { "" },
                pattern
            ),
            Predicate::Between { low, high, negated } => write!(
                f,
                "{} {}BETWEEN {} AND {}",
                self.column,
                if *negated { "NOT " } else { "" },
                low,
                high
            ),
            Predicate::InList { values, negated } => write!(
                f,
                "{} {}IN ({})",
                self.column,
                if *negated { "NOT " } else { "" },
                values.join(", ")
            ),
        }
    }
}

/// SQL LIKE matching: `%` is any sequence, `_` is one character, every
/// other character is literal.
fn matches_like_pattern(text: &str, pattern: &str) -> bool {
    let mut regex_pattern = String::with_capacity(pattern.len() * 2 + 2);
    regex_pattern.push('^');
    for c in pattern.chars() {
        match c {
            '%' => regex_pattern.push_str(".*"),
            '_' => regex_pattern.push('.'),
            c => regex_pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex_pattern.push('$');

    match Regex::new(&regex_pattern) {
        Ok(re) => re.is_match(text),
        Err(_) => false,
    }
}
