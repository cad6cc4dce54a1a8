//! Cost calculation: [`CostCalculator`], [`TablePricing`], and the
//! `PricingConfig`/`ModelPricing` shapes a host parses a pricing file into.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-1M-token pricing for one model.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_price_per_1m: f64,
    pub output_price_per_1m: f64,
}

/// The parsed shape of a pricing file (§6): `{default_pricing, custom_pricing, use_defaults}`.
/// Reading the file off disk is the host's job; this type is what the host
/// hands `serde_json::from_str` output to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub default_pricing: HashMap<String, ModelPricing>,
    #[serde(default)]
    pub custom_pricing: HashMap<String, ModelPricing>,
    #[serde(default = "default_use_defaults")]
    pub use_defaults: bool,
}

fn default_use_defaults() -> bool {
    true
}

/// Computes the dollar cost of one LLM call from its token counts.
pub trait CostCalculator: Send + Sync {
    /// Returns `None` (with the caller expected to log a warning) when no
    /// pricing is registered for `model`, per §4.8: "missing pricing yields
    /// zero cost and a warning."
    fn cost(&self, provider: &str, model: &str, input_tokens: u64, output_tokens: u64) -> Option<f64>;
}

/// `HashMap`-backed [`CostCalculator`], keyed `"{provider}/{model}"` with a
/// bare `"{model}"` fallback lookup for pricing tables that don't qualify by
/// provider.
#[derive(Debug, Clone, Default)]
pub struct TablePricing {
    table: HashMap<String, ModelPricing>,
}

impl TablePricing {
    pub fn new(config: PricingConfig) -> Self {
        let mut table = HashMap::new();
        if config.use_defaults {
            table.extend(config.default_pricing);
        }
        table.extend(config.custom_pricing);
        Self { table }
    }

    pub fn insert(&mut self, model: impl Into<String>, pricing: ModelPricing) {
        self.table.insert(model.into(), pricing);
    }

    fn lookup(&self, provider: &str, model: &str) -> Option<&ModelPricing> {
        self.table
            .get(&format!("{provider}/{model}"))
            .or_else(|| self.table.get(model))
    }
}

impl CostCalculator for TablePricing {
    fn cost(&self, provider: &str, model: &str, input_tokens: u64, output_tokens: u64) -> Option<f64> {
        let pricing = self.lookup(provider, model)?;
        let input_cost = (input_tokens as f64 / 1_000_000.0) * pricing.input_price_per_1m;
        let output_cost = (output_tokens as f64 / 1_000_000.0) * pricing.output_price_per_1m;
        Some(input_cost + output_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_pricing_returns_none() {
        let pricing = TablePricing::default();
        assert!(pricing.cost("openai", "gpt-4o", 100, 50).is_none());
    }

    #[test]
    fn custom_pricing_overrides_default_for_same_key() {
        let mut config = PricingConfig::default();
        config.default_pricing.insert(
            "gpt-4o".to_string(),
            ModelPricing {
                input_price_per_1m: 5.0,
                output_price_per_1m: 15.0,
            },
        );
        config.custom_pricing.insert(
            "gpt-4o".to_string(),
            ModelPricing {
                input_price_per_1m: 1.0,
                output_price_per_1m: 2.0,
            },
        );
        let pricing = TablePricing::new(config);
        let cost = pricing.cost("openai", "gpt-4o", 1_000_000, 1_000_000).unwrap();
        assert_eq!(cost, 3.0);
    }

    #[test]
    fn use_defaults_false_ignores_default_pricing() {
        let mut config = PricingConfig {
            use_defaults: false,
            ..Default::default()
        };
        config.default_pricing.insert(
            "gpt-4o".to_string(),
            ModelPricing {
                input_price_per_1m: 5.0,
                output_price_per_1m: 15.0,
            },
        );
        let pricing = TablePricing::new(config);
        assert!(pricing.cost("openai", "gpt-4o", 100, 100).is_none());
    }
}
