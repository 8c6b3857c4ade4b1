//! Predicate Module
//!
//! Closed set of filters the persistent store interprets for `find_all`.

use serde::{Deserialize, Serialize};

use crate::entity::Entity;

// == Field Value ==
/// A comparable attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

// == Predicate ==
/// Filter over entity attributes.
///
/// Serialized with an `op` tag, e.g.
/// `{"op": "field_equals", "field": "category", "value": "books"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// Attribute equals the value
    FieldEquals { field: String, value: FieldValue },
    /// Attribute equals one of the values
    FieldInList { field: String, values: Vec<FieldValue> },
    /// String attribute contains the substring (case-insensitive)
    FieldContains { field: String, needle: String },
    /// Every inner predicate matches
    And { all: Vec<Predicate> },
}

impl Predicate {
    /// Builds a `FieldEquals` predicate.
    pub fn equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Predicate::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Builds a `FieldInList` predicate.
    pub fn in_list<V: Into<FieldValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Predicate::FieldInList {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a `FieldContains` predicate.
    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Predicate::FieldContains {
            field: field.into(),
            needle: needle.into(),
        }
    }

    /// Combines this predicate with another one.
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And { mut all } => {
                all.push(other);
                Predicate::And { all }
            }
            first => Predicate::And {
                all: vec![first, other],
            },
        }
    }

    // == Evaluation ==
    /// Returns true if the entity satisfies the predicate.
    ///
    /// Unknown fields never match.
    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        match self {
            Predicate::FieldEquals { field, value } => {
                entity.field(field).as_ref() == Some(value)
            }
            Predicate::FieldInList { field, values } => entity
                .field(field)
                .is_some_and(|actual| values.contains(&actual)),
            Predicate::FieldContains { field, needle } => match entity.field(field) {
                Some(FieldValue::Str(actual)) => actual
                    .to_lowercase()
                    .contains(&needle.to_lowercase()),
                _ => false,
            },
            Predicate::And { all } => all.iter().all(|p| p.matches(entity)),
        }
    }
}
