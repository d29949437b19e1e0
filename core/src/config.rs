use crate::types::Cents;
use serde::{Deserialize, Serialize};

/// Calculator tuning knobs. Loaded from `{data_dir}/calculator.json`;
/// tests use `CalcConfig::default()`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CalcConfig {
    /// Fallback value of one point when neither the user, the selected
    /// template nor the currency itself provides one.
    pub default_point_value_cents: f64,
    /// How many cards `recommend()` returns.
    pub recommendation_limit: usize,
    /// Single-transaction size above which spend counts as a large purchase.
    pub large_purchase_threshold_cents: Cents,
    /// Slug of the catalog category that carries large-purchase rules.
    pub large_purchase_category_slug: String,
    /// Run the per-card replacement pass in `calculate()`.
    pub compute_marginal_values: bool,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            default_point_value_cents: 1.0,
            recommendation_limit: 3,
            large_purchase_threshold_cents: 500_000,
            large_purchase_category_slug: "large-purchases".into(),
            compute_marginal_values: true,
        }
    }
}

impl CalcConfig {
    /// Load from the data/ directory. Missing keys take their defaults.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/calculator.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: CalcConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.default_point_value_cents < 0.0 {
            anyhow::bail!(
                "defaultPointValueCents must be non-negative, got {}",
                self.default_point_value_cents
            );
        }
        if self.large_purchase_threshold_cents <= 0 {
            anyhow::bail!("largePurchaseThresholdCents must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: CalcConfig =
            serde_json::from_str(r#"{ "recommendationLimit": 5 }"#).unwrap();
        assert_eq!(config.recommendation_limit, 5);
        assert_eq!(config.default_point_value_cents, 1.0);
        assert_eq!(config.large_purchase_category_slug, "large-purchases");
    }

    #[test]
    fn negative_point_value_rejected() {
        let config = CalcConfig {
            default_point_value_cents: -1.0,
            ..CalcConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
