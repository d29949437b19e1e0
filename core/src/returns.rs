//! Portfolio returns: aggregation of one allocation pass into the
//! totals and breakdowns the pages display.
//!
//! All money fields are dollars. Rates are percentages.

use crate::{
    allocator::{AllocationOutcome, CategoryAllocation, Scenario},
    catalog::CurrencyType,
    portfolio::EarningsGoal,
    types::{cents_to_dollars, CardId, Cents, CurrencyId},
    valuation::Valuer,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardBreakdown {
    pub card_id: CardId,
    pub card_name: String,
    pub currency_id: CurrencyId,
    pub spend: f64,
    pub points_earned: f64,
    pub value: f64,
    pub debit_pay_value: f64,
    pub annual_fee: f64,
    pub perks_value: f64,
    pub net_annual_fee: f64,
    pub net_value: f64,
    pub return_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marginal_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyBreakdown {
    pub currency_id: CurrencyId,
    pub currency_name: String,
    pub currency_type: CurrencyType,
    pub points_earned: f64,
    pub value_per_point_cents: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioReturns {
    pub earnings_goal: EarningsGoal,
    pub total_spend: f64,
    pub total_value: f64,
    pub total_annual_fees: f64,
    pub total_perks_value: f64,
    pub net_annual_fees: f64,
    pub net_value_earned: f64,
    pub net_return_rate: f64,
    pub cashback_value: f64,
    pub points_value: f64,
    pub debit_pay_value: f64,
    pub category_breakdown: Vec<CategoryAllocation>,
    pub card_breakdown: Vec<CardBreakdown>,
    pub currency_breakdown: Vec<CurrencyBreakdown>,
}

impl PortfolioReturns {
    pub fn card(&self, card_id: &str) -> Option<&CardBreakdown> {
        self.card_breakdown.iter().find(|c| c.card_id == card_id)
    }

    pub fn category(&self, category_id: &str) -> Option<&CategoryAllocation> {
        self.category_breakdown.iter().find(|c| c.category_id == category_id)
    }

    pub fn currency(&self, currency_id: &str) -> Option<&CurrencyBreakdown> {
        self.currency_breakdown.iter().find(|c| c.currency_id == currency_id)
    }
}

fn percent(value: f64, spend: f64) -> f64 {
    if spend > 0.0 {
        value / spend * 100.0
    } else {
        0.0
    }
}

/// Fold one allocation pass into portfolio totals.
pub fn summarize(outcome: AllocationOutcome, scenario: &Scenario<'_>, valuer: &Valuer<'_>) -> PortfolioReturns {
    let categories = outcome.categories;
    let allocations = || categories.iter().flat_map(|c| c.allocations.iter());

    // ── Cards ──────────────────────────────────────────────────
    let card_breakdown: Vec<CardBreakdown> = scenario
        .cards
        .iter()
        .map(|card| {
            let mine: Vec<_> = allocations().filter(|a| a.card_id == card.id).collect();
            let spend_cents: Cents = mine.iter().map(|a| a.spend_cents).sum();
            let spend = cents_to_dollars(spend_cents);
            let value: f64 = mine.iter().map(|a| a.value).sum();
            let perks_value = valuer.perks_value(card);
            let net_annual_fee = card.annual_fee - perks_value;
            CardBreakdown {
                card_id: card.id.clone(),
                card_name: card.name.clone(),
                currency_id: valuer.earning_currency(card, &scenario.cards).to_string(),
                spend,
                points_earned: mine.iter().map(|a| a.points_earned).sum(),
                value,
                debit_pay_value: mine.iter().map(|a| a.debit_pay_value).sum(),
                annual_fee: card.annual_fee,
                perks_value,
                net_annual_fee,
                net_value: value - net_annual_fee,
                return_rate: percent(value, spend),
                marginal_value: None,
                replacement_value: None,
            }
        })
        .collect();

    // ── Currencies ─────────────────────────────────────────────
    let mut by_currency: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for a in allocations() {
        let entry = by_currency.entry(a.currency_id.as_str()).or_insert((0.0, 0.0));
        entry.0 += a.points_earned;
        entry.1 += a.rewards_value;
    }
    let mut currency_breakdown: Vec<CurrencyBreakdown> = by_currency
        .into_iter()
        .map(|(currency_id, (points_earned, value))| {
            let currency = valuer.currency(currency_id);
            CurrencyBreakdown {
                currency_id: currency_id.to_string(),
                currency_name: currency.map_or_else(|| currency_id.to_string(), |c| c.name.clone()),
                currency_type: valuer.currency_type(currency_id),
                points_earned,
                value_per_point_cents: valuer.effective_value_cents(currency_id),
                value,
            }
        })
        .collect();
    currency_breakdown.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.currency_id.cmp(&b.currency_id)));

    // ── Totals ─────────────────────────────────────────────────
    let total_spend = cents_to_dollars(categories.iter().map(|c| c.total_spend_cents).sum());
    let total_value: f64 = allocations().map(|a| a.value).sum();
    let cashback_value: f64 = allocations()
        .filter(|a| valuer.is_cash(&a.currency_id))
        .map(|a| a.rewards_value)
        .sum();
    let points_value: f64 = allocations()
        .filter(|a| !valuer.is_cash(&a.currency_id))
        .map(|a| a.rewards_value)
        .sum();
    let debit_pay_value: f64 = allocations().map(|a| a.debit_pay_value).sum();
    let total_annual_fees: f64 = card_breakdown.iter().map(|c| c.annual_fee).sum();
    let total_perks_value: f64 = card_breakdown.iter().map(|c| c.perks_value).sum();
    let net_annual_fees = total_annual_fees - total_perks_value;
    let net_value_earned = total_value - net_annual_fees;

    PortfolioReturns {
        earnings_goal: valuer.goal(),
        total_spend,
        total_value,
        total_annual_fees,
        total_perks_value,
        net_annual_fees,
        net_value_earned,
        net_return_rate: percent(net_value_earned, total_spend),
        cashback_value,
        points_value,
        debit_pay_value,
        category_breakdown: categories,
        card_breakdown,
        currency_breakdown,
    }
}
