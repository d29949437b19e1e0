//! The user side of a calculation: which cards are held, how much is spent
//! where, and every per-user preference that changes how rewards are valued.

use crate::{
    error::{CalcError, CalcResult},
    types::{cents_to_dollars, BonusId, CardId, CategoryId, Cents, CurrencyId},
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpending {
    pub category_id: CategoryId,
    pub annual_spend_cents: Cents,
    /// Portion of the annual spend made in single large transactions.
    #[serde(default)]
    pub large_purchase_spend_cents: Cents,
}

impl CategorySpending {
    pub fn new(category_id: &str, annual_spend_cents: Cents) -> Self {
        Self {
            category_id: category_id.to_string(),
            annual_spend_cents,
            large_purchase_spend_cents: 0,
        }
    }

    /// Large-purchase portion, never more than the whole.
    pub fn large_purchase_cents(&self) -> Cents {
        self.large_purchase_spend_cents.clamp(0, self.annual_spend_cents.max(0))
    }

    pub fn regular_cents(&self) -> Cents {
        self.annual_spend_cents - self.large_purchase_cents()
    }
}

/// An opted-in multiplier tier (elite status, relationship bonus, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MultiplierProgram {
    pub id: String,
    pub name: String,
    pub multiplier: f64,
    #[serde(default)]
    pub currency_ids: Vec<CurrencyId>,
    #[serde(default)]
    pub card_ids: Vec<CardId>,
}

impl MultiplierProgram {
    pub fn covers(&self, card_id: &str, currency_id: &str) -> bool {
        self.card_ids.iter().any(|c| c == card_id)
            || self.currency_ids.iter().any(|c| c == currency_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TravelPreferenceType {
    Portal,
    Direct,
    Brand,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TravelPreference {
    pub category_slug: String,
    pub preference_type: TravelPreferenceType,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub portal_issuer_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EarningsGoal {
    #[default]
    Maximize,
    CashOnly,
    PointsOnly,
}

impl EarningsGoal {
    pub fn as_str(self) -> &'static str {
        match self {
            EarningsGoal::Maximize => "maximize",
            EarningsGoal::CashOnly => "cash_only",
            EarningsGoal::PointsOnly => "points_only",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "maximize" => Some(EarningsGoal::Maximize),
            "cash_only" => Some(EarningsGoal::CashOnly),
            "points_only" => Some(EarningsGoal::PointsOnly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPortfolio {
    pub held_card_ids: Vec<CardId>,
    pub spending: Vec<CategorySpending>,
    /// Cents per point the user set by hand.
    pub user_currency_values: HashMap<CurrencyId, f64>,
    /// Cents per point from the user's selected valuation template.
    pub default_currency_values: HashMap<CurrencyId, f64>,
    /// Cash redemption rate per currency, cents per point.
    pub cash_out_values: HashMap<CurrencyId, f64>,
    /// Dollars per year of perks the user actually uses.
    pub perks_values: HashMap<CardId, f64>,
    /// Extra cash percentage for paying the card from a linked debit account.
    pub debit_pay_values: HashMap<CardId, f64>,
    pub multiplier_programs: Vec<MultiplierProgram>,
    pub travel_preferences: Vec<TravelPreference>,
    pub enabled_secondary_cards: HashSet<CardId>,
    /// `selected_category` bonus choices: bonus id → chosen category.
    pub bonus_selections: HashMap<BonusId, CategoryId>,
    pub earnings_goal: EarningsGoal,
}

impl UserPortfolio {
    pub fn total_spend_cents(&self) -> Cents {
        self.spending.iter().map(|s| s.annual_spend_cents.max(0)).sum()
    }

    pub fn total_spend(&self) -> f64 {
        cents_to_dollars(self.total_spend_cents())
    }

    pub fn holds(&self, card_id: &str) -> bool {
        self.held_card_ids.iter().any(|c| c == card_id)
    }

    pub fn spend_for(&self, category_id: &str) -> Cents {
        self.spending
            .iter()
            .filter(|s| s.category_id == category_id)
            .map(|s| s.annual_spend_cents)
            .sum()
    }

    /// Reject inputs that break the non-negative spend invariant.
    pub fn validate(&self) -> CalcResult<()> {
        for s in &self.spending {
            if s.annual_spend_cents < 0 {
                return Err(CalcError::InvalidInput {
                    reason: format!(
                        "negative annual spend {} for category {}",
                        s.annual_spend_cents, s.category_id
                    ),
                });
            }
            if s.large_purchase_spend_cents < 0 {
                return Err(CalcError::InvalidInput {
                    reason: format!(
                        "negative large-purchase spend {} for category {}",
                        s.large_purchase_spend_cents, s.category_id
                    ),
                });
            }
        }
        for (card_id, pct) in &self.debit_pay_values {
            if *pct < 0.0 {
                return Err(CalcError::InvalidInput {
                    reason: format!("negative debit-pay percentage {pct} for card {card_id}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_purchase_portion_is_clamped() {
        let s = CategorySpending {
            category_id: "electronics".into(),
            annual_spend_cents: 300_000,
            large_purchase_spend_cents: 900_000,
        };
        assert_eq!(s.large_purchase_cents(), 300_000);
        assert_eq!(s.regular_cents(), 0);
    }

    #[test]
    fn negative_spend_is_invalid() {
        let p = UserPortfolio {
            spending: vec![CategorySpending::new("dining", -1)],
            ..UserPortfolio::default()
        };
        assert!(matches!(p.validate(), Err(CalcError::InvalidInput { .. })));
    }

    #[test]
    fn earnings_goal_uses_snake_case_on_the_wire() {
        let goal: EarningsGoal = serde_json::from_str("\"cash_only\"").unwrap();
        assert_eq!(goal, EarningsGoal::CashOnly);
        assert_eq!(EarningsGoal::parse(goal.as_str()), Some(goal));
    }
}
