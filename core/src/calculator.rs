//! The returns calculator: entry point for every page that shows
//! portfolio returns, card marginal values or recommendations.
//!
//! A calculation is a pure function of
//!   (reference data, user portfolio, config) → results.
//! The calculator builds its indexes once and then runs as many
//! allocation passes as needed (one for the portfolio, one per held card
//! for marginal values, one per catalog card for recommendations). Passes
//! share only read-only data; each owns its cap ledger.

use crate::{
    allocator::{Allocator, Scenario},
    catalog::ReferenceData,
    config::CalcConfig,
    error::CalcResult,
    marginal,
    portfolio::UserPortfolio,
    recommendation::{self, CardRecommendation},
    returns::{summarize, PortfolioReturns},
    rule_resolver::RuleResolver,
    valuation::Valuer,
};

pub struct ReturnsCalculator<'a> {
    reference: &'a ReferenceData,
    portfolio: &'a UserPortfolio,
    config:    &'a CalcConfig,
    resolver:  RuleResolver<'a>,
    valuer:    Valuer<'a>,
}

impl<'a> ReturnsCalculator<'a> {
    pub fn new(
        reference: &'a ReferenceData,
        portfolio: &'a UserPortfolio,
        config: &'a CalcConfig,
    ) -> CalcResult<Self> {
        portfolio.validate()?;
        Ok(Self {
            reference,
            portfolio,
            config,
            resolver: RuleResolver::new(reference, portfolio, config),
            valuer: Valuer::new(reference, portfolio, config),
        })
    }

    pub fn reference(&self) -> &'a ReferenceData {
        self.reference
    }

    pub fn portfolio(&self) -> &'a UserPortfolio {
        self.portfolio
    }

    /// The user's held cards, in holding order. Ids missing from the
    /// catalog are skipped; duplicates count once.
    pub fn held_scenario(&self) -> Scenario<'a> {
        let mut scenario = Scenario::new(Vec::new());
        for card_id in &self.portfolio.held_card_ids {
            match self.reference.card(card_id) {
                Some(card) => scenario = scenario.with(card),
                None => log::warn!("calc: held card {card_id} is not in the catalog; skipped"),
            }
        }
        scenario
    }

    /// One allocation pass over `scenario`, without marginal values.
    pub fn evaluate(&self, scenario: &Scenario<'_>) -> PortfolioReturns {
        let allocator = Allocator::new(&self.resolver, &self.valuer);
        let outcome = allocator.allocate(scenario, &self.portfolio.spending);
        summarize(outcome, scenario, &self.valuer)
    }

    /// Portfolio returns for the held cards, with per-card marginal and
    /// replacement values unless disabled in config.
    pub fn calculate(&self) -> PortfolioReturns {
        let scenario = self.held_scenario();
        let mut returns = self.evaluate(&scenario);
        if self.config.compute_marginal_values {
            marginal::apply_marginal_values(self, &scenario, &mut returns);
        }

        log::info!(
            "calc: {} cards, {} categories, goal={} spend=${:.2} value=${:.2} net=${:.2} ({:.2}%)",
            scenario.cards.len(),
            returns.category_breakdown.len(),
            returns.earnings_goal.as_str(),
            returns.total_spend,
            returns.total_value,
            returns.net_value_earned,
            returns.net_return_rate
        );
        returns
    }

    /// Top catalog cards by net value added to the portfolio.
    pub fn recommend(&self) -> Vec<CardRecommendation> {
        recommendation::recommend(self, self.config.recommendation_limit)
    }
}

/// Convenience wrapper: build a calculator and run `calculate()`.
pub fn calculate_returns(
    reference: &ReferenceData,
    portfolio: &UserPortfolio,
    config: &CalcConfig,
) -> CalcResult<PortfolioReturns> {
    Ok(ReturnsCalculator::new(reference, portfolio, config)?.calculate())
}

/// Convenience wrapper: build a calculator and run `recommend()`.
pub fn recommend_cards(
    reference: &ReferenceData,
    portfolio: &UserPortfolio,
    config: &CalcConfig,
) -> CalcResult<Vec<CardRecommendation>> {
    Ok(ReturnsCalculator::new(reference, portfolio, config)?.recommend())
}
