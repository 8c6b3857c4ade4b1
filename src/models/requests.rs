//! Request DTOs for the product API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::predicate::Predicate;

/// Largest id list accepted by a single batch request.
pub const MAX_BATCH_IDS: usize = 1000;

/// Request body for `POST /products/batch`
#[derive(Debug, Clone, Deserialize)]
pub struct BatchGetRequest {
    pub ids: Vec<u64>,
}

impl BatchGetRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.ids.len() > MAX_BATCH_IDS {
            return Some(format!("Batch exceeds maximum of {} ids", MAX_BATCH_IDS));
        }
        None
    }
}

/// Request body for `POST /products/search`
///
/// A missing predicate matches every row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub predicate: Option<Predicate>,
}

/// Request body for `POST /cache/products/invalidate`
///
/// Without `ids`, the whole cache is cleared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateRequest {
    #[serde(default)]
    pub ids: Option<Vec<u64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::FieldValue;

    #[test]
    fn test_batch_request_deserialize() {
        let req: BatchGetRequest = serde_json::from_str(r#"{"ids": [3, 7, 11]}"#).unwrap();
        assert_eq!(req.ids, vec![3, 7, 11]);
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_batch_request_too_large() {
        let req = BatchGetRequest {
            ids: (0..=MAX_BATCH_IDS as u64).collect(),
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_search_request_with_predicate() {
        let json = r#"{"predicate": {"op": "field_equals", "field": "category", "value": "tools"}}"#;
        let req: SearchRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            req.predicate,
            Some(Predicate::FieldEquals {
                field: "category".to_string(),
                value: FieldValue::Str("tools".to_string()),
            })
        );
    }

    #[test]
    fn test_empty_bodies_use_defaults() {
        let search: SearchRequest = serde_json::from_str("{}").unwrap();
        let invalidate: InvalidateRequest = serde_json::from_str("{}").unwrap();
        assert!(search.predicate.is_none());
        assert!(invalidate.ids.is_none());
    }
}
