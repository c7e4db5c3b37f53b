use crate::config::PricingConfig;

/// Token counts reported by the completion endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Per-token prices in dollars.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rates {
    pub input: f64,
    pub output: f64,
}

/// Built-in list prices, dollars per million tokens (input, output).
/// Must be updated when a model's price changes.
const MODEL_PRICES: &[(&str, f64, f64)] = &[
    ("gpt-oss-20b", 0.02, 0.10),
    ("gpt-5-nano", 0.05, 0.40),
    ("gpt-4.1-nano", 0.10, 0.40),
    ("gpt-4o-mini", 0.15, 0.60),
    ("gpt-4.1-mini", 0.40, 1.60),
];

impl Rates {
    pub fn per_million(input: f64, output: f64) -> Self {
        Self {
            input: input / 1_000_000.0,
            output: output / 1_000_000.0,
        }
    }

    /// Rates for `model`, with config overrides taking precedence field by field.
    /// An unknown model with no override prices at zero.
    pub fn resolve(model: &str, overrides: &PricingConfig) -> Self {
        let listed = lookup(model);
        if listed.is_none()
            && (overrides.input_per_million.is_none() || overrides.output_per_million.is_none())
        {
            tracing::warn!(
                "no price known for model '{model}'; set [pricing] to log real costs"
            );
        }
        let (list_in, list_out) = listed.unwrap_or((0.0, 0.0));
        Self::per_million(
            overrides.input_per_million.unwrap_or(list_in),
            overrides.output_per_million.unwrap_or(list_out),
        )
    }

    pub fn cost(&self, usage: Usage) -> f64 {
        usage.input_tokens as f64 * self.input + usage.output_tokens as f64 * self.output
    }
}

fn lookup(model: &str) -> Option<(f64, f64)> {
    MODEL_PRICES
        .iter()
        .find(|(name, _, _)| *name == model)
        .map(|&(_, input, output)| (input, output))
}
