//! Marginal value: what each held card contributes.
//!
//!   replacementValue = totalValue of the portfolio re-optimized without the card
//!   marginalValue    = totalValue − replacementValue − netAnnualFee(card)
//!
//! One full allocation pass per held card. Removing a card can also turn
//! off another card's secondary currency; the re-run picks that up.

use crate::{allocator::Scenario, calculator::ReturnsCalculator, returns::PortfolioReturns};

/// Total value of `scenario` with `card_id` removed and its spend reallocated.
pub fn replacement_value(calc: &ReturnsCalculator<'_>, scenario: &Scenario<'_>, card_id: &str) -> f64 {
    calc.evaluate(&scenario.without(card_id)).total_value
}

pub fn apply_marginal_values(
    calc: &ReturnsCalculator<'_>,
    scenario: &Scenario<'_>,
    returns: &mut PortfolioReturns,
) {
    let total_value = returns.total_value;
    for card in &mut returns.card_breakdown {
        let replacement = replacement_value(calc, scenario, &card.card_id);
        let marginal = total_value - replacement - card.net_annual_fee;
        log::debug!(
            "calc: marginal {}: replacement=${replacement:.2} marginal=${marginal:.2}",
            card.card_id
        );
        card.replacement_value = Some(replacement);
        card.marginal_value = Some(marginal);
    }
}
