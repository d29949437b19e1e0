//! Currency valuation: turning points into dollars.
//!
//! Value per point is resolved by priority:
//!   1. the user's own override
//!   2. the user's selected valuation template
//!   3. the currency's base value
//!   4. the configured default (1¢)
//!
//! The earnings goal then adjusts that value:
//!   - maximize:    unchanged
//!   - cash_only:   cash back unchanged; everything else at its cash-out
//!                  rate, or worth nothing when it has none
//!   - points_only: cash back (and debit pay) worth nothing

use crate::{
    catalog::{CardInput, Currency, CurrencyType, ReferenceData},
    config::CalcConfig,
    portfolio::{EarningsGoal, UserPortfolio},
    types::{cents_to_dollars, Cents},
};
use std::collections::HashMap;

pub struct Valuer<'a> {
    currencies: HashMap<&'a str, &'a Currency>,
    portfolio: &'a UserPortfolio,
    default_point_value_cents: f64,
}

impl<'a> Valuer<'a> {
    pub fn new(reference: &'a ReferenceData, portfolio: &'a UserPortfolio, config: &CalcConfig) -> Self {
        Self {
            currencies: reference.currencies.iter().map(|c| (c.id.as_str(), c)).collect(),
            portfolio,
            default_point_value_cents: config.default_point_value_cents,
        }
    }

    pub fn goal(&self) -> EarningsGoal {
        self.portfolio.earnings_goal
    }

    pub fn currency(&self, currency_id: &str) -> Option<&'a Currency> {
        self.currencies.get(currency_id).copied()
    }

    /// Unknown currencies are never cash.
    pub fn currency_type(&self, currency_id: &str) -> CurrencyType {
        self.currency(currency_id)
            .map_or(CurrencyType::Other, |c| c.currency_type)
    }

    pub fn is_cash(&self, currency_id: &str) -> bool {
        self.currency_type(currency_id).is_cash()
    }

    /// Cents per point before the earnings goal is applied.
    pub fn resolved_value_cents(&self, currency_id: &str) -> f64 {
        self.portfolio
            .user_currency_values
            .get(currency_id)
            .or_else(|| self.portfolio.default_currency_values.get(currency_id))
            .copied()
            .or_else(|| self.currency(currency_id).and_then(|c| c.base_value_cents))
            .unwrap_or(self.default_point_value_cents)
    }

    /// Cash redemption rate; `None` when the currency cannot be cashed out.
    pub fn cash_out_value_cents(&self, currency_id: &str) -> Option<f64> {
        self.portfolio
            .cash_out_values
            .get(currency_id)
            .copied()
            .or_else(|| self.currency(currency_id).and_then(|c| c.cash_out_value_cents))
    }

    /// Cents per point under the user's earnings goal.
    pub fn effective_value_cents(&self, currency_id: &str) -> f64 {
        let cash = self.is_cash(currency_id);
        match self.goal() {
            EarningsGoal::Maximize => self.resolved_value_cents(currency_id),
            EarningsGoal::CashOnly if cash => self.resolved_value_cents(currency_id),
            EarningsGoal::CashOnly => self.cash_out_value_cents(currency_id).unwrap_or(0.0),
            EarningsGoal::PointsOnly if cash => 0.0,
            EarningsGoal::PointsOnly => self.resolved_value_cents(currency_id),
        }
    }

    /// Product of every opted-in program covering this card or currency.
    pub fn multiplier(&self, card_id: &str, currency_id: &str) -> f64 {
        self.portfolio
            .multiplier_programs
            .iter()
            .filter(|p| p.covers(card_id, currency_id))
            .map(|p| p.multiplier)
            .product()
    }

    /// The currency `card` earns when `active` is the card set.
    ///
    /// A secondary currency only counts when the user enabled it for the
    /// card and another card in the set earns it as its primary currency.
    pub fn earning_currency<'c>(&self, card: &'c CardInput, active: &[&CardInput]) -> &'c str {
        if let Some(secondary) = card.secondary_currency_id.as_deref() {
            let enabled = self.portfolio.enabled_secondary_cards.contains(&card.id);
            let unlocked = active
                .iter()
                .any(|other| other.id != card.id && other.primary_currency_id == secondary);
            if enabled && unlocked {
                return secondary;
            }
        }
        &card.primary_currency_id
    }

    /// Flat debit-pay bonus, in dollars, on `spend_cents` put on `card_id`.
    pub fn debit_pay_value(&self, card_id: &str, spend_cents: Cents) -> f64 {
        if self.goal() == EarningsGoal::PointsOnly {
            return 0.0;
        }
        let pct = self.portfolio.debit_pay_values.get(card_id).copied().unwrap_or(0.0);
        cents_to_dollars(spend_cents) * pct / 100.0
    }

    /// Perks value offsetting the annual fee: the user's figure, else the
    /// card's default.
    pub fn perks_value(&self, card: &CardInput) -> f64 {
        self.portfolio
            .perks_values
            .get(&card.id)
            .copied()
            .unwrap_or(card.default_perks_value)
    }
}
