//! Category spend allocator.
//!
//! Each category's spend goes to the single card that earns the most
//! dollar value on it. Greedy and per-category:
//!
//!   1. Categories are visited largest spend first (ties by id), so shared
//!      caps are spent where the spend is.
//!   2. For every active card, the spend is poured through the card's rate
//!      tiers, highest rate first, each capped tier only up to its remaining
//!      headroom in the ledger. Spend past a cap earns that tier's post-cap
//!      rate; a tier without one hands the rest to the next tier down.
//!   3. The card with the highest value wins (ties: more points, then
//!      earlier card). Only the winner's cap consumption is committed.
//!
//! The large-purchase share of a category is allocated separately, after
//! the regular share, and may land on a different card.

use crate::{
    cap_ledger::{CapKey, CapLedger},
    catalog::{CapSpec, CardInput},
    portfolio::CategorySpending,
    rule_resolver::{RateSource, RateTier, RuleResolver},
    types::{cents_to_dollars, points_for_spend, points_to_dollars, CategoryId, Cents},
    valuation::Valuer,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Values within this distance are considered equal when ranking options.
const VALUE_EPSILON: f64 = 1e-9;

// ── Output ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RateSegment {
    pub source: RateSource,
    pub rate: f64,
    pub spend_cents: Cents,
    /// Points before any multiplier program.
    pub points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardAllocation {
    pub card_id: String,
    pub card_name: String,
    pub currency_id: String,
    pub spend_cents: Cents,
    pub spend: f64,
    /// Blended points per dollar across segments, before multipliers.
    pub rate: f64,
    pub multiplier: f64,
    /// Points after multipliers.
    pub points_earned: f64,
    pub value_per_point_cents: f64,
    pub rewards_value: f64,
    pub debit_pay_value: f64,
    pub value: f64,
    pub is_large_purchase: bool,
    pub segments: Vec<RateSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAllocation {
    pub category_id: CategoryId,
    pub category_name: String,
    pub total_spend_cents: Cents,
    pub total_spend: f64,
    pub allocations: Vec<CardAllocation>,
    pub value: f64,
    /// Return on spend, percent.
    pub return_rate: f64,
}

impl CategoryAllocation {
    pub fn allocated_cents(&self) -> Cents {
        self.allocations.iter().map(|a| a.spend_cents).sum()
    }
}

// ── Scenario ───────────────────────────────────────────────────────

/// The card set one allocation pass runs against.
#[derive(Debug, Clone)]
pub struct Scenario<'a> {
    pub cards: Vec<&'a CardInput>,
}

impl<'a> Scenario<'a> {
    pub fn new(cards: Vec<&'a CardInput>) -> Self {
        Self { cards }
    }

    pub fn without(&self, card_id: &str) -> Self {
        Self {
            cards: self.cards.iter().copied().filter(|c| c.id != card_id).collect(),
        }
    }

    pub fn with(&self, card: &'a CardInput) -> Self {
        let mut cards = self.cards.clone();
        if !cards.iter().any(|c| c.id == card.id) {
            cards.push(card);
        }
        Self { cards }
    }

    pub fn contains(&self, card_id: &str) -> bool {
        self.cards.iter().any(|c| c.id == card_id)
    }
}

pub struct AllocationOutcome {
    pub categories: Vec<CategoryAllocation>,
    pub ledger: CapLedger,
}

// ── Fill planning ──────────────────────────────────────────────────

/// A slice of spend assigned to one tier.
#[derive(Debug, Clone, PartialEq)]
pub struct FillStep {
    pub tier: RateTier,
    pub spend_cents: Cents,
}

impl FillStep {
    fn cap(&self) -> Option<(CapKey, CapSpec)> {
        Some((self.tier.cap_key()?, self.tier.cap?))
    }
}

/// Pour `spend_cents` through `tiers` (already highest rate first),
/// respecting the headroom left in `ledger`. Leaves the ledger untouched.
///
/// RULE: spend past a cap earns that cap's post-cap rate, even when a
/// lower tier in the list would pay more.
pub fn plan_fill(tiers: &[RateTier], spend_cents: Cents, ledger: &CapLedger) -> Vec<FillStep> {
    let mut remaining = spend_cents;
    let mut steps = Vec::new();
    for tier in tiers {
        if remaining <= 0 {
            break;
        }
        let take = match (tier.cap_key(), tier.cap.as_ref()) {
            (Some(key), Some(cap)) => remaining.min(ledger.spend_headroom(&key, cap, tier.rate)),
            _ => remaining,
        };
        if take > 0 {
            steps.push(FillStep { tier: tier.clone(), spend_cents: take });
            remaining -= take;
        }
        if remaining > 0 {
            if let Some(overflow) = tier.overflow_tier() {
                steps.push(FillStep { tier: overflow, spend_cents: remaining });
                break;
            }
        }
    }
    steps
}

// ── Allocator ──────────────────────────────────────────────────────

pub struct Allocator<'r, 'a> {
    resolver: &'r RuleResolver<'a>,
    valuer: &'r Valuer<'a>,
}

struct Candidate {
    allocation: CardAllocation,
    steps: Vec<FillStep>,
}

impl<'r, 'a> Allocator<'r, 'a> {
    pub fn new(resolver: &'r RuleResolver<'a>, valuer: &'r Valuer<'a>) -> Self {
        Self { resolver, valuer }
    }

    pub fn allocate(&self, scenario: &Scenario<'_>, spending: &[CategorySpending]) -> AllocationOutcome {
        let mut ledger = CapLedger::new();
        let currencies: Vec<&str> = scenario
            .cards
            .iter()
            .map(|card| self.valuer.earning_currency(card, &scenario.cards))
            .collect();

        let mut categories = Vec::new();
        for row in merge_spending(spending) {
            let category_name = match self.resolver.tree().get(&row.category_id) {
                Some(c) => c.name.clone(),
                None => {
                    log::warn!("calc: spending on unknown category {}; default rates only", row.category_id);
                    row.category_id.clone()
                }
            };

            let mut allocations = Vec::new();
            for (cents, large) in [(row.regular_cents, false), (row.large_cents, true)] {
                if cents <= 0 {
                    continue;
                }
                if let Some(a) = self.allocate_portion(scenario, &currencies, &row.category_id, cents, large, &mut ledger) {
                    allocations.push(a);
                }
            }

            let total_spend_cents = row.regular_cents + row.large_cents;
            let value: f64 = allocations.iter().map(|a| a.value).sum();
            let total_spend = cents_to_dollars(total_spend_cents);
            categories.push(CategoryAllocation {
                return_rate: if total_spend > 0.0 { value / total_spend * 100.0 } else { 0.0 },
                category_id: row.category_id,
                category_name,
                total_spend_cents,
                total_spend,
                allocations,
                value,
            });
        }

        AllocationOutcome { categories, ledger }
    }

    fn allocate_portion(
        &self,
        scenario: &Scenario<'_>,
        currencies: &[&str],
        category_id: &str,
        spend_cents: Cents,
        large_purchase: bool,
        ledger: &mut CapLedger,
    ) -> Option<CardAllocation> {
        let mut best: Option<Candidate> = None;

        for (card, currency_id) in scenario.cards.iter().zip(currencies) {
            let tiers = self.resolver.tiers(card, category_id, large_purchase);
            let steps = plan_fill(&tiers, spend_cents, ledger);
            let allocation = self.price(card, currency_id, &steps, large_purchase);

            let wins = match &best {
                None => true,
                Some(b) => beats(&allocation, &b.allocation),
            };
            if wins {
                best = Some(Candidate { allocation, steps });
            }
        }

        let Candidate { allocation, steps } = best?;
        for step in &steps {
            if let Some((key, cap)) = step.cap() {
                ledger.consume(&key, &cap, step.spend_cents, step.tier.rate);
            }
        }

        log::debug!(
            "calc: {category_id}{} ${:.2} -> {} at {:.2}x, value ${:.2}",
            if large_purchase { " (large purchases)" } else { "" },
            allocation.spend,
            allocation.card_id,
            allocation.rate,
            allocation.value
        );
        Some(allocation)
    }

    fn price(&self, card: &CardInput, currency_id: &str, steps: &[FillStep], large_purchase: bool) -> CardAllocation {
        let segments: Vec<RateSegment> = steps
            .iter()
            .map(|s| RateSegment {
                source: s.tier.source.clone(),
                rate: s.tier.rate,
                spend_cents: s.spend_cents,
                points: points_for_spend(s.spend_cents, s.tier.rate),
            })
            .collect();

        let spend_cents: Cents = segments.iter().map(|s| s.spend_cents).sum();
        let base_points: f64 = segments.iter().map(|s| s.points).sum();
        let multiplier = self.valuer.multiplier(&card.id, currency_id);
        let points_earned = base_points * multiplier;
        let value_per_point_cents = self.valuer.effective_value_cents(currency_id);
        let rewards_value = points_to_dollars(points_earned, value_per_point_cents);
        let debit_pay_value = self.valuer.debit_pay_value(&card.id, spend_cents);
        let spend = cents_to_dollars(spend_cents);

        CardAllocation {
            card_id: card.id.clone(),
            card_name: card.name.clone(),
            currency_id: currency_id.to_string(),
            spend_cents,
            spend,
            rate: if spend > 0.0 { base_points / spend } else { 0.0 },
            multiplier,
            points_earned,
            value_per_point_cents,
            rewards_value,
            debit_pay_value,
            value: rewards_value + debit_pay_value,
            is_large_purchase: large_purchase,
            segments,
        }
    }
}

fn beats(challenger: &CardAllocation, incumbent: &CardAllocation) -> bool {
    if challenger.value > incumbent.value + VALUE_EPSILON {
        return true;
    }
    (challenger.value - incumbent.value).abs() <= VALUE_EPSILON
        && challenger.points_earned > incumbent.points_earned + VALUE_EPSILON
}

struct SpendRow {
    category_id: CategoryId,
    regular_cents: Cents,
    large_cents: Cents,
}

/// Merge duplicate category rows and order largest spend first.
fn merge_spending(spending: &[CategorySpending]) -> Vec<SpendRow> {
    let mut merged: HashMap<&str, SpendRow> = HashMap::new();
    for s in spending {
        let row = merged.entry(s.category_id.as_str()).or_insert_with(|| SpendRow {
            category_id: s.category_id.clone(),
            regular_cents: 0,
            large_cents: 0,
        });
        row.regular_cents += s.regular_cents().max(0);
        row.large_cents += s.large_purchase_cents();
    }

    let mut rows: Vec<SpendRow> = merged
        .into_values()
        .filter(|r| r.regular_cents + r.large_cents > 0)
        .collect();
    rows.sort_by(|a, b| {
        (b.regular_cents + b.large_cents)
            .cmp(&(a.regular_cents + a.large_cents))
            .then_with(|| a.category_id.cmp(&b.category_id))
    });
    rows
}
