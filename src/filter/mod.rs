//! Frontmatter filters.
//!
//! A [`FilterExpression`] is a small boolean tree over metadata predicates.
//! Its JSON form is externally tagged:
//!
//! ```json
//! {"and": [
//!     {"metadata": {"field": "author", "op": "equals", "value": "Alice"}},
//!     {"not": {"metadata": {"field": "draft", "op": "exists"}}}
//! ]}
//! ```

mod compare;
mod stream;

pub use compare::values_equal;
pub use stream::{filter_stream, FilterStream, HasMetadata, StreamOrder};

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parser::{Frontmatter, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataOp {
    Exists,
    NotExists,
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterExpression {
    Metadata {
        field: String,
        op: MetadataOp,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
    And(Vec<FilterExpression>),
    Or(Vec<FilterExpression>),
    Not(Box<FilterExpression>),
}

impl FilterExpression {
    pub fn metadata(field: impl Into<String>, op: MetadataOp, value: Option<Value>) -> Self {
        FilterExpression::Metadata {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::metadata(field, MetadataOp::Equals, Some(value.into()))
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::metadata(field, MetadataOp::Exists, None)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: FilterExpression) -> Self {
        FilterExpression::Not(Box::new(child))
    }

    /// Decodes the JSON wire form. `null` means no filter.
    pub fn from_json(value: serde_json::Value) -> Result<Option<Self>> {
        if value.is_null() {
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|err| Error::filter(err.to_string()))
    }

    /// Evaluates the expression against one document's frontmatter.
    pub fn evaluate(&self, metadata: &Frontmatter) -> Result<bool> {
        match self {
            FilterExpression::Metadata { field, op, value } => {
                evaluate_metadata(field, *op, value.as_ref(), metadata)
            }
            FilterExpression::And(children) => {
                for child in children {
                    if !child.evaluate(metadata)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            FilterExpression::Or(children) => {
                if children.is_empty() {
                    return Ok(true);
                }
                for child in children {
                    if child.evaluate(metadata)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            FilterExpression::Not(child) => Ok(!child.evaluate(metadata)?),
        }
    }
}

/// Evaluates an optional filter; no filter accepts everything.
pub fn evaluate(expr: Option<&FilterExpression>, metadata: &Frontmatter) -> Result<bool> {
    match expr {
        Some(expr) => expr.evaluate(metadata),
        None => Ok(true),
    }
}

fn evaluate_metadata(
    field: &str,
    op: MetadataOp,
    value: Option<&Value>,
    metadata: &Frontmatter,
) -> Result<bool> {
    let doc_value = metadata.get(field);

    let test: fn(&Value, &Value) -> bool = match op {
        MetadataOp::Exists => return Ok(doc_value.is_some()),
        MetadataOp::NotExists => return Ok(doc_value.is_none()),
        MetadataOp::Equals => compare::values_equal,
        MetadataOp::NotEquals => |doc, filter| !compare::values_equal(doc, filter),
        MetadataOp::Contains => compare::contains,
        MetadataOp::StartsWith => compare::starts_with,
        MetadataOp::EndsWith => compare::ends_with,
        MetadataOp::GreaterThan => {
            |doc, filter| compare::ordering(doc, filter).is_some_and(Ordering::is_gt)
        }
        MetadataOp::GreaterThanOrEqual => {
            |doc, filter| compare::ordering(doc, filter).is_some_and(Ordering::is_ge)
        }
        MetadataOp::LessThan => {
            |doc, filter| compare::ordering(doc, filter).is_some_and(Ordering::is_lt)
        }
        MetadataOp::LessThanOrEqual => {
            |doc, filter| compare::ordering(doc, filter).is_some_and(Ordering::is_le)
        }
        MetadataOp::In => compare::is_in,
        MetadataOp::NotIn => |doc, filter| !compare::is_in(doc, filter),
    };

    let Some(filter_value) = value else {
        return Err(Error::filter(format!(
            "operator {op:?} on field '{field}' requires a value"
        )));
    };

    Ok(doc_value.is_some_and(|doc_value| test(doc_value, filter_value)))
}
