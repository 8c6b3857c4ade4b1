//! Product entity served by the HTTP API.

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::predicate::FieldValue;

// == Product ==
/// A catalogue row. An `id` of 0 marks a draft the store has not numbered yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

fn default_in_stock() -> bool {
    true
}

impl Product {
    /// Creates an in-stock product with a known id.
    pub fn new(
        id: u64,
        name: impl Into<String>,
        category: impl Into<String>,
        price_cents: i64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            price_cents,
            in_stock: true,
        }
    }

    /// Creates a product without an id; the store assigns one on upsert.
    pub fn draft(name: impl Into<String>, category: impl Into<String>, price_cents: i64) -> Self {
        Self::new(0, name, category, price_cents)
    }

    /// Copy with a different price.
    pub fn with_price(&self, price_cents: i64) -> Self {
        Self {
            price_cents,
            ..self.clone()
        }
    }

    /// Copy with a different stock flag.
    pub fn with_stock(&self, in_stock: bool) -> Self {
        Self {
            in_stock,
            ..self.clone()
        }
    }
}

impl Entity for Product {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => i64::try_from(self.id).ok().map(FieldValue::Int),
            "name" => Some(FieldValue::Str(self.name.clone())),
            "category" => Some(FieldValue::Str(self.category.clone())),
            "price_cents" => Some(FieldValue::Int(self.price_cents)),
            "in_stock" => Some(FieldValue::Bool(self.in_stock)),
            _ => None,
        }
    }

    fn is_transient(&self) -> bool {
        self.id == 0
    }

    fn with_generated_id(self, seq: u64) -> Self {
        Self { id: seq, ..self }
    }
}
