//! Kubernetes resource quantities.
//!
//! Accepts the canonical quantity grammar: an unsigned decimal number
//! followed by an optional binary-SI suffix (`Ki`..`Ei`), decimal-SI suffix
//! (`n`, `u`, `m`, `k`, `M`..`E`) or a decimal exponent (`e3`, `E-2`).
//! Negative quantities are rejected since they are never valid requests.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::{ModelError, ModelResult};

fn quantity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^\+?([0-9]+(\.[0-9]*)?|\.[0-9]+)(Ki|Mi|Gi|Ti|Pi|Ei|n|u|m|k|M|G|T|P|E|[eE][+-]?[0-9]+)?$",
        )
        .expect("quantity pattern is valid")
    })
}

/// A validated resource quantity such as `500m`, `2` or `4Gi`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(String);

impl Quantity {
    /// Parse a quantity; `field` names the flag for error messages.
    pub fn parse(field: &str, value: &str) -> ModelResult<Self> {
        let trimmed = value.trim();
        if quantity_pattern().is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ModelError::InvalidQuantity {
                field: field.to_string(),
                value: value.to_string(),
            })
        }
    }

    /// Parse an optional quantity where the empty string means "not requested".
    pub fn parse_optional(field: &str, value: &str) -> ModelResult<Option<Self>> {
        if value.trim().is_empty() {
            return Ok(None);
        }
        Self::parse(field, value).map(Some)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
