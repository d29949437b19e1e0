//! Reference data: the read-only catalog snapshot every calculation runs
//! against: currencies, categories, cards, earning rules and category bonuses.
//!
//! RULE: The catalog is passed explicitly into each calculation.
//! Nothing in the calculator caches it globally.

use crate::types::{BonusId, CardId, CategoryId, CurrencyId, RuleId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

// ── Currencies ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyType {
    Cashback,
    Points,
    AirlineMiles,
    HotelPoints,
    TransferablePoints,
    Other,
}

impl CurrencyType {
    /// Cash back is the only currency type that is already cash.
    pub fn is_cash(self) -> bool {
        matches!(self, CurrencyType::Cashback)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub id: CurrencyId,
    pub name: String,
    pub currency_type: CurrencyType,
    #[serde(default)]
    pub base_value_cents: Option<f64>,
    #[serde(default)]
    pub cash_out_value_cents: Option<f64>,
}

// ── Categories ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub excluded_by_default: bool,
}

// ── Cards ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardInput {
    pub id: CardId,
    pub name: String,
    pub issuer_id: String,
    /// Dollars per year.
    pub annual_fee: f64,
    pub default_earn_rate: f64,
    pub primary_currency_id: CurrencyId,
    #[serde(default)]
    pub secondary_currency_id: Option<CurrencyId>,
    /// Dollars per year of perks a typical holder uses.
    #[serde(default)]
    pub default_perks_value: f64,
    #[serde(default)]
    pub exclude_from_recommendations: bool,
}

// ── Caps ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapPeriod {
    Monthly,
    Quarterly,
    #[default]
    Annually,
    CardmemberYear,
}

impl CapPeriod {
    /// Number of cap resets in a year of evenly spread spend.
    pub fn periods_per_year(self) -> f64 {
        match self {
            CapPeriod::Monthly => 12.0,
            CapPeriod::Quarterly => 4.0,
            CapPeriod::Annually | CapPeriod::CardmemberYear => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapUnit {
    /// Cap amount is dollars of spend.
    #[default]
    Spend,
    /// Cap amount is points earned at the elevated rate.
    Rewards,
}

/// A cap as written on the card terms, before annualization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapSpec {
    pub amount: f64,
    pub period: CapPeriod,
    pub unit: CapUnit,
}

impl CapSpec {
    /// Cap amount for a full year of spend, in the cap's own unit.
    pub fn annual_amount(&self) -> f64 {
        self.amount * self.period.periods_per_year()
    }
}

// ── Earning rules ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingMethod {
    #[default]
    Any,
    Portal,
    Direct,
    Brand,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EarningRuleInput {
    pub id: RuleId,
    pub card_id: CardId,
    pub category_id: CategoryId,
    pub rate: f64,
    #[serde(default)]
    pub has_cap: bool,
    #[serde(default)]
    pub cap_amount: Option<f64>,
    #[serde(default)]
    pub cap_period: CapPeriod,
    #[serde(default)]
    pub cap_unit: CapUnit,
    #[serde(default)]
    pub post_cap_rate: Option<f64>,
    #[serde(default)]
    pub booking_method: BookingMethod,
    #[serde(default)]
    pub brand_name: Option<String>,
}

impl EarningRuleInput {
    pub fn cap(&self) -> Option<CapSpec> {
        cap_spec(self.has_cap, self.cap_amount, self.cap_period, self.cap_unit)
    }
}

// ── Category bonuses ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapType {
    /// One shared cap across every category in the set.
    #[default]
    Combined,
    /// The user picks one category from the set.
    SelectedCategory,
    /// Applies to whichever category in the set has the most spend.
    TopCategory,
    /// Applies to the two highest-spend categories in the set.
    TopTwoCategories,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBonusInput {
    pub id: BonusId,
    pub card_id: CardId,
    pub name: String,
    pub rate: f64,
    #[serde(default)]
    pub cap_type: CapType,
    pub category_ids: Vec<CategoryId>,
    #[serde(default)]
    pub cap_amount: Option<f64>,
    #[serde(default)]
    pub cap_period: CapPeriod,
    #[serde(default)]
    pub cap_unit: CapUnit,
    #[serde(default)]
    pub post_cap_rate: Option<f64>,
}

impl CategoryBonusInput {
    /// Bonuses are capped whenever an amount is present.
    pub fn cap(&self) -> Option<CapSpec> {
        cap_spec(true, self.cap_amount, self.cap_period, self.cap_unit)
    }
}

fn cap_spec(has_cap: bool, amount: Option<f64>, period: CapPeriod, unit: CapUnit) -> Option<CapSpec> {
    match (has_cap, amount) {
        (true, Some(amount)) if amount >= 0.0 => Some(CapSpec { amount, period, unit }),
        _ => None,
    }
}

// ── Snapshot ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferenceData {
    pub currencies: Vec<Currency>,
    pub categories: Vec<Category>,
    pub cards: Vec<CardInput>,
    pub earning_rules: Vec<EarningRuleInput>,
    pub category_bonuses: Vec<CategoryBonusInput>,
}

impl ReferenceData {
    /// Load the catalog from `{data_dir}/catalog/*.json`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let dir = format!("{data_dir}/catalog");
        Ok(Self {
            currencies: read_json(&format!("{dir}/currencies.json"))?,
            categories: read_json(&format!("{dir}/categories.json"))?,
            cards: read_json(&format!("{dir}/cards.json"))?,
            earning_rules: read_json(&format!("{dir}/earning_rules.json"))?,
            category_bonuses: read_json(&format!("{dir}/category_bonuses.json"))?,
        })
    }

    pub fn card(&self, card_id: &str) -> Option<&CardInput> {
        self.cards.iter().find(|c| c.id == card_id)
    }

    pub fn currency(&self, currency_id: &str) -> Option<&Currency> {
        self.currencies.iter().find(|c| c.id == currency_id)
    }

    pub fn category(&self, category_id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == category_id)
    }

    pub fn category_by_slug(&self, slug: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.slug == slug)
    }
}

fn read_json<T: DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarterly_cap_annualizes_to_four_periods() {
        let cap = CapSpec { amount: 1_500.0, period: CapPeriod::Quarterly, unit: CapUnit::Spend };
        assert_eq!(cap.annual_amount(), 6_000.0);
    }

    #[test]
    fn rule_without_cap_flag_is_uncapped() {
        let rule: EarningRuleInput = serde_json::from_str(
            r#"{ "id": "r1", "cardId": "c1", "categoryId": "dining",
                 "rate": 3.0, "hasCap": false, "capAmount": 500.0 }"#,
        )
        .unwrap();
        assert!(rule.cap().is_none());
        assert_eq!(rule.booking_method, BookingMethod::Any);
    }

    #[test]
    fn bonus_without_amount_is_uncapped() {
        let bonus: CategoryBonusInput = serde_json::from_str(
            r#"{ "id": "b1", "cardId": "c1", "name": "Groceries", "rate": 4.0,
                 "categoryIds": ["groceries"] }"#,
        )
        .unwrap();
        assert!(bonus.cap().is_none());
        assert_eq!(bonus.cap_type, CapType::Combined);
    }
}
