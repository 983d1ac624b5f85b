//! Mapping from Stripe price ids to application plan tiers.

use std::collections::HashMap;

use crate::domain::foundation::ValidationError;

/// Plan assigned when a price is unknown or absent.
pub const DEFAULT_PLAN: &str = "essential";

/// Resolves the plan tier a paid invoice grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCatalog {
    prices: HashMap<String, String>,
    default_plan: String,
}

impl PlanCatalog {
    /// Creates a catalog with no price mappings.
    pub fn new(default_plan: impl Into<String>) -> Self {
        Self {
            prices: HashMap::new(),
            default_plan: default_plan.into(),
        }
    }

    /// Adds a price to plan mapping.
    pub fn with_price(mut self, price_id: impl Into<String>, plan: impl Into<String>) -> Self {
        self.prices.insert(price_id.into(), plan.into());
        self
    }

    /// Parses `price_a=essential,price_b=pro`.
    ///
    /// Blank input yields an empty mapping. Whitespace around entries is ignored.
    pub fn parse(mapping: &str, default_plan: impl Into<String>) -> Result<Self, ValidationError> {
        let mut catalog = Self::new(default_plan);

        for entry in mapping.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (price, plan) = entry.split_once('=').ok_or_else(|| {
                ValidationError::invalid_format("price_plans", format!("expected price=plan, got '{}'", entry))
            })?;
            let (price, plan) = (price.trim(), plan.trim());
            if price.is_empty() || plan.is_empty() {
                return Err(ValidationError::invalid_format(
                    "price_plans",
                    format!("empty price or plan in '{}'", entry),
                ));
            }
            catalog.prices.insert(price.to_string(), plan.to_string());
        }

        Ok(catalog)
    }

    /// Returns the plan for `price_id`, falling back to the default plan.
    pub fn resolve(&self, price_id: Option<&str>) -> &str {
        price_id
            .and_then(|price| self.prices.get(price))
            .map(String::as_str)
            .unwrap_or(self.default_plan.as_str())
    }

    /// Returns the fallback plan.
    pub fn default_plan(&self) -> &str {
        &self.default_plan
    }

    /// Number of explicit price mappings.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_PLAN)
    }
}
