//! Card recommendations: which catalog card would add the most net value.
//!
//! Each eligible candidate gets a full allocation pass with the card
//! added to the held set. Candidates are ranked by the change in
//! `netValueEarned`, so a card's fee (less its perks) counts against it.
//!
//! Users with no recorded spend get no recommendations; the search is
//! skipped entirely.

use crate::{calculator::ReturnsCalculator, types::CardId};
use serde::{Deserialize, Serialize};

/// Improvements at or below this many dollars are not worth showing.
const MIN_IMPROVEMENT: f64 = 0.005;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardRecommendation {
    pub card_id: CardId,
    pub card_name: String,
    pub issuer_id: String,
    pub annual_fee: f64,
    pub default_perks_value: f64,
    /// Dollars per year added to net value earned.
    pub improvement: f64,
    pub new_total_value: f64,
    pub new_net_value: f64,
}

pub fn recommend(calc: &ReturnsCalculator<'_>, limit: usize) -> Vec<CardRecommendation> {
    let portfolio = calc.portfolio();
    if portfolio.total_spend_cents() == 0 {
        log::debug!("calc: no recorded spend; skipping recommendations");
        return Vec::new();
    }

    let held = calc.held_scenario();
    let current = calc.evaluate(&held);

    let candidates: Vec<_> = calc
        .reference()
        .cards
        .iter()
        .filter(|c| !c.exclude_from_recommendations)
        .filter(|c| !held.contains(&c.id) && !portfolio.holds(&c.id))
        .collect();

    let mut recommendations: Vec<CardRecommendation> = candidates
        .iter()
        .copied()
        .filter_map(|card| {
            let trial = calc.evaluate(&held.with(card));
            let improvement = trial.net_value_earned - current.net_value_earned;
            log::debug!("calc: candidate {} improves net value by ${improvement:.2}", card.id);
            (improvement > MIN_IMPROVEMENT).then(|| CardRecommendation {
                card_id: card.id.clone(),
                card_name: card.name.clone(),
                issuer_id: card.issuer_id.clone(),
                annual_fee: card.annual_fee,
                default_perks_value: card.default_perks_value,
                improvement,
                new_total_value: trial.total_value,
                new_net_value: trial.net_value_earned,
            })
        })
        .collect();

    recommendations.sort_by(|a, b| {
        b.improvement
            .total_cmp(&a.improvement)
            .then_with(|| a.card_id.cmp(&b.card_id))
    });
    recommendations.truncate(limit);

    log::info!(
        "calc: evaluated {} candidates, returning {} recommendations",
        candidates.len(),
        recommendations.len()
    );
    recommendations
}
