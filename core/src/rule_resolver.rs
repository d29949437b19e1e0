//! Rule & cap resolution: which earning rates a card offers for a category.
//!
//! For each (card, category) the resolver produces a list of `RateTier`s:
//!   - the card's default earn rate (always present, uncapped)
//!   - every qualifying earning rule, found on the category or, failing
//!     that, on the nearest ancestor that has one
//!   - every category bonus whose active set covers the category
//!
//! A capped tier carries its own post-cap rate. Spend past the cap earns
//! that rate, or falls through to the next tier when there is none.
//!
//! The resolver does NOT pick a winner. The allocator walks the tiers in
//! order against the cap ledger, because a high nominal rate may already
//! be exhausted.
//!
//! Two small decision tables live here as plain functions so they can be
//! tested in isolation:
//!   - `booking_qualifies`   : travel preference vs. booking qualifier
//!   - `select_bonus_target` : which categories a bonus is live for

use crate::{
    cap_ledger::CapKey,
    catalog::{
        BookingMethod, CapSpec, CapType, CardInput, CategoryBonusInput, EarningRuleInput,
        ReferenceData,
    },
    category_tree::CategoryTree,
    config::CalcConfig,
    portfolio::{TravelPreference, TravelPreferenceType, UserPortfolio},
    types::{BonusId, CategoryId, Cents, RuleId},
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Where an earning rate came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RateSource {
    Default,
    Rule(RuleId),
    Bonus(BonusId),
    PostCap(CapKey),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateTier {
    pub rate: f64,
    pub source: RateSource,
    pub cap: Option<CapSpec>,
    /// Only meaningful on capped tiers.
    pub post_cap_rate: Option<f64>,
}

impl RateTier {
    /// Ledger key for capped tiers.
    pub fn cap_key(&self) -> Option<CapKey> {
        self.cap?;
        match &self.source {
            RateSource::Rule(id) => Some(CapKey::Rule(id.clone())),
            RateSource::Bonus(id) => Some(CapKey::Bonus(id.clone())),
            _ => None,
        }
    }

    /// The uncapped tier that takes this tier's spend past its cap.
    pub fn overflow_tier(&self) -> Option<RateTier> {
        let key = self.cap_key()?;
        Some(RateTier {
            rate: self.post_cap_rate?,
            source: RateSource::PostCap(key),
            cap: None,
            post_cap_rate: None,
        })
    }
}

/// Categories a bonus is live for, after applying the user's choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BonusTarget {
    /// Every category in the bonus set.
    AnyInSet,
    /// Only these members of the set.
    Only(HashSet<CategoryId>),
    Inactive,
}

// ── Decision tables ────────────────────────────────────────────────

/// Does a rule's booking qualifier match how the user books this category?
///
/// | rule       | preference                                   |
/// |------------|----------------------------------------------|
/// | any        | anything, including none                     |
/// | portal     | portal, via any portal or this card's issuer |
/// | direct     | direct or brand                              |
/// | brand      | brand, same brand name (case-insensitive)    |
pub fn booking_qualifies(
    rule: &EarningRuleInput,
    card: &CardInput,
    preference: Option<&TravelPreference>,
) -> bool {
    if rule.booking_method == BookingMethod::Any {
        return true;
    }
    let Some(pref) = preference else {
        return false;
    };
    match (rule.booking_method, pref.preference_type) {
        (BookingMethod::Portal, TravelPreferenceType::Portal) => pref
            .portal_issuer_id
            .as_deref()
            .map_or(true, |issuer| issuer == card.issuer_id),
        (BookingMethod::Direct, TravelPreferenceType::Direct | TravelPreferenceType::Brand) => true,
        (BookingMethod::Brand, TravelPreferenceType::Brand) => {
            match (rule.brand_name.as_deref(), pref.brand_name.as_deref()) {
                (Some(want), Some(have)) => want.eq_ignore_ascii_case(have),
                _ => false,
            }
        }
        _ => false,
    }
}

/// Resolve the live categories of a bonus.
///
/// `ranked` lists the members of the bonus set that carry spend, highest
/// spend first. `card_held` distinguishes the user's own cards (whose
/// `selected_category` bonuses need an explicit choice) from hypothetical
/// cards being evaluated for recommendation (which default to the best
/// member).
pub fn select_bonus_target(
    bonus: &CategoryBonusInput,
    selection: Option<&CategoryId>,
    card_held: bool,
    ranked: &[CategoryId],
) -> BonusTarget {
    let top = |n: usize| -> BonusTarget {
        if ranked.is_empty() {
            BonusTarget::Inactive
        } else {
            BonusTarget::Only(ranked.iter().take(n).cloned().collect())
        }
    };
    match bonus.cap_type {
        CapType::Combined => BonusTarget::AnyInSet,
        CapType::TopCategory => top(1),
        CapType::TopTwoCategories => top(2),
        CapType::SelectedCategory => match selection {
            Some(chosen) if bonus.category_ids.contains(chosen) => {
                BonusTarget::Only(HashSet::from([chosen.clone()]))
            }
            Some(chosen) => {
                log::warn!(
                    "calc: selection {chosen} for bonus {} is not in its category set; bonus inactive",
                    bonus.id
                );
                BonusTarget::Inactive
            }
            None if card_held => BonusTarget::Inactive,
            None => top(1),
        },
    }
}

// ── Resolver ───────────────────────────────────────────────────────

pub struct RuleResolver<'a> {
    tree: CategoryTree<'a>,
    rules_by_card: HashMap<&'a str, Vec<&'a EarningRuleInput>>,
    bonuses_by_card: HashMap<&'a str, Vec<&'a CategoryBonusInput>>,
    bonus_targets: HashMap<&'a str, BonusTarget>,
    preferences: &'a [TravelPreference],
    large_purchase_category: Option<&'a str>,
}

impl<'a> RuleResolver<'a> {
    pub fn new(reference: &'a ReferenceData, portfolio: &'a UserPortfolio, config: &CalcConfig) -> Self {
        let tree = CategoryTree::new(&reference.categories);

        let mut rules_by_card: HashMap<&str, Vec<&EarningRuleInput>> = HashMap::new();
        for rule in &reference.earning_rules {
            rules_by_card.entry(rule.card_id.as_str()).or_default().push(rule);
        }

        let mut bonuses_by_card: HashMap<&str, Vec<&CategoryBonusInput>> = HashMap::new();
        for bonus in &reference.category_bonuses {
            bonuses_by_card.entry(bonus.card_id.as_str()).or_default().push(bonus);
        }

        let spend = spend_by_category(portfolio);
        let bonus_targets = reference
            .category_bonuses
            .iter()
            .map(|bonus| {
                let ranked = rank_members(&tree, bonus, &spend);
                let target = select_bonus_target(
                    bonus,
                    portfolio.bonus_selections.get(&bonus.id),
                    portfolio.holds(&bonus.card_id),
                    &ranked,
                );
                (bonus.id.as_str(), target)
            })
            .collect();

        let large_purchase_category = reference
            .category_by_slug(&config.large_purchase_category_slug)
            .map(|c| c.id.as_str());

        Self {
            tree,
            rules_by_card,
            bonuses_by_card,
            bonus_targets,
            preferences: &portfolio.travel_preferences,
            large_purchase_category,
        }
    }

    pub fn tree(&self) -> &CategoryTree<'a> {
        &self.tree
    }

    /// The travel preference governing a category: its own slug first,
    /// then the nearest ancestor's.
    pub fn preference_for(&self, category_id: &str) -> Option<&'a TravelPreference> {
        self.tree
            .slug_chain(category_id)
            .into_iter()
            .find_map(|slug| self.preferences.iter().find(|p| p.category_slug == slug))
    }

    /// All rate tiers `card` offers on `category_id`, highest rate first.
    /// Equal rates list uncapped tiers first so caps are not burned for nothing.
    pub fn tiers(&self, card: &CardInput, category_id: &str, large_purchase: bool) -> Vec<RateTier> {
        let mut tiers = vec![RateTier {
            rate: card.default_earn_rate,
            source: RateSource::Default,
            cap: None,
            post_cap_rate: None,
        }];

        let chain = self.tree.rule_lookup_chain(category_id);
        self.push_rule_tiers(card, category_id, &chain, &mut tiers);
        self.push_bonus_tiers(card, &chain, &mut tiers);

        if large_purchase {
            if let Some(lp) = self.large_purchase_category.filter(|lp| *lp != category_id) {
                self.push_rule_tiers(card, lp, &[lp], &mut tiers);
                self.push_bonus_tiers(card, &[lp], &mut tiers);
            }
        }

        tiers.sort_by(|a, b| {
            b.rate
                .total_cmp(&a.rate)
                .then(a.cap.is_some().cmp(&b.cap.is_some()))
        });
        tiers
    }

    /// Rules from the nearest link of `chain` that has any qualifying rule.
    fn push_rule_tiers(&self, card: &CardInput, category_id: &str, chain: &[&str], out: &mut Vec<RateTier>) {
        let Some(rules) = self.rules_by_card.get(card.id.as_str()) else {
            return;
        };
        let preference = self.preference_for(category_id);

        for link in chain {
            let matched: Vec<&EarningRuleInput> = rules
                .iter()
                .copied()
                .filter(|r| r.category_id == *link && booking_qualifies(r, card, preference))
                .collect();
            if matched.is_empty() {
                continue;
            }
            for rule in matched {
                push_capped(
                    out,
                    rule.rate,
                    RateSource::Rule(rule.id.clone()),
                    rule.cap(),
                    rule.post_cap_rate,
                );
            }
            return;
        }
    }

    fn push_bonus_tiers(&self, card: &CardInput, chain: &[&str], out: &mut Vec<RateTier>) {
        let Some(bonuses) = self.bonuses_by_card.get(card.id.as_str()) else {
            return;
        };
        for bonus in bonuses {
            let live = match self.bonus_targets.get(bonus.id.as_str()) {
                Some(BonusTarget::AnyInSet) => {
                    chain.iter().any(|id| bonus.category_ids.iter().any(|c| c.as_str() == *id))
                }
                Some(BonusTarget::Only(set)) => chain.iter().any(|id| set.contains(*id)),
                Some(BonusTarget::Inactive) | None => false,
            };
            if live {
                push_capped(
                    out,
                    bonus.rate,
                    RateSource::Bonus(bonus.id.clone()),
                    bonus.cap(),
                    bonus.post_cap_rate,
                );
            }
        }
    }
}

fn push_capped(
    out: &mut Vec<RateTier>,
    rate: f64,
    source: RateSource,
    cap: Option<CapSpec>,
    post_cap_rate: Option<f64>,
) {
    out.push(RateTier {
        rate,
        source,
        post_cap_rate: cap.and(post_cap_rate),
        cap,
    });
}

fn spend_by_category(portfolio: &UserPortfolio) -> HashMap<&str, Cents> {
    let mut spend: HashMap<&str, Cents> = HashMap::new();
    for s in &portfolio.spending {
        *spend.entry(s.category_id.as_str()).or_insert(0) += s.annual_spend_cents.max(0);
    }
    spend
}

/// Members of a bonus set that carry spend (directly or through
/// subcategories), highest spend first, ties by id.
fn rank_members(
    tree: &CategoryTree<'_>,
    bonus: &CategoryBonusInput,
    spend: &HashMap<&str, Cents>,
) -> Vec<CategoryId> {
    let mut ranked: Vec<(CategoryId, Cents)> = bonus
        .category_ids
        .iter()
        .map(|member| {
            let total: Cents = spend
                .iter()
                .filter(|(category_id, _)| tree.rule_lookup_chain(**category_id).contains(&member.as_str()))
                .map(|(_, cents)| *cents)
                .sum();
            (member.clone(), total)
        })
        .filter(|(_, total)| *total > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().map(|(id, _)| id).collect()
}
