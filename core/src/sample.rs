//! Synthetic scenarios: a seeded catalog and portfolio for demos and
//! property checks. Same seed, same scenario.

use crate::{
    catalog::{
        BookingMethod, CapPeriod, CapType, CapUnit, CardInput, Category, CategoryBonusInput,
        Currency, CurrencyType, EarningRuleInput, ReferenceData,
    },
    portfolio::{
        CategorySpending, EarningsGoal, MultiplierProgram, TravelPreference, TravelPreferenceType,
        UserPortfolio,
    },
    rng::{SampleRng, SampleStream},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticScenario {
    pub seed: u64,
    pub reference: ReferenceData,
    pub portfolio: UserPortfolio,
}

/// (id, name, parent, excluded_by_default, median annual spend in dollars)
const CATEGORIES: &[(&str, &str, Option<&str>, bool, f64)] = &[
    ("dining", "Dining", None, false, 3_000.0),
    ("groceries", "Groceries", None, false, 6_000.0),
    ("gas", "Gas", None, false, 1_800.0),
    ("travel", "Travel", None, false, 2_500.0),
    ("hotels", "Hotels", Some("travel"), false, 1_500.0),
    ("airfare", "Airfare", Some("travel"), false, 1_500.0),
    ("streaming", "Streaming", None, false, 300.0),
    ("online-shopping", "Online Shopping", None, false, 2_000.0),
    ("drugstores", "Drugstores", None, false, 600.0),
    ("rent", "Rent", None, true, 18_000.0),
    ("large-purchases", "Large Purchases", None, false, 0.0),
    ("everything-else", "Everything Else", None, false, 5_000.0),
];

/// (id, name, type, base value, cash-out value)
const CURRENCIES: &[(&str, &str, CurrencyType, f64, Option<f64>)] = &[
    ("cash", "Cash Back", CurrencyType::Cashback, 1.0, Some(1.0)),
    ("flex", "Flex Points", CurrencyType::TransferablePoints, 1.6, Some(1.0)),
    ("sky", "Sky Miles", CurrencyType::AirlineMiles, 1.2, None),
    ("stay", "Stay Points", CurrencyType::HotelPoints, 0.6, Some(0.4)),
];

const ISSUERS: &[&str] = &["northbank", "eastfin", "summit"];
const BRANDS: &[&str] = &["Hyatt", "Marriott", "Hilton"];
const FEES: &[f64] = &[0.0, 0.0, 95.0, 250.0, 550.0];
const CAP_PERIODS: &[CapPeriod] = &[CapPeriod::Monthly, CapPeriod::Quarterly, CapPeriod::Annually];
const CAP_TYPES: &[CapType] = &[
    CapType::Combined,
    CapType::SelectedCategory,
    CapType::TopCategory,
    CapType::TopTwoCategories,
];

/// Build the scenario for `seed`.
pub fn synthetic_scenario(seed: u64) -> SyntheticScenario {
    let reference = synthetic_reference(seed);
    let portfolio = synthetic_portfolio(seed, &reference);
    SyntheticScenario { seed, reference, portfolio }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn bonus_eligible_categories() -> Vec<&'static str> {
    CATEGORIES
        .iter()
        .filter(|(id, _, _, excluded, _)| !excluded && *id != "large-purchases" && *id != "everything-else")
        .map(|(id, ..)| *id)
        .collect()
}

pub fn synthetic_reference(seed: u64) -> ReferenceData {
    let mut rng = SampleRng::new(seed, SampleStream::Catalog);

    let currencies = CURRENCIES
        .iter()
        .map(|(id, name, kind, base, cash_out)| Currency {
            id: id.to_string(),
            name: name.to_string(),
            currency_type: *kind,
            base_value_cents: Some(*base),
            cash_out_value_cents: *cash_out,
        })
        .collect();

    let categories = CATEGORIES
        .iter()
        .map(|(id, name, parent, excluded, _)| Category {
            id: id.to_string(),
            name: name.to_string(),
            slug: id.to_string(),
            parent_id: parent.map(str::to_string),
            excluded_by_default: *excluded,
        })
        .collect();

    let eligible = bonus_eligible_categories();
    let card_count = 6 + rng.next_u64_below(7) as usize;
    let mut cards = Vec::with_capacity(card_count);
    let mut earning_rules = Vec::new();
    let mut category_bonuses = Vec::new();

    for i in 0..card_count {
        let card_id = format!("card-{i:02}");
        let primary = CURRENCIES[rng.next_u64_below(CURRENCIES.len() as u64) as usize].0;
        let secondary = (primary == "cash" && rng.chance(0.4)).then(|| "flex".to_string());
        let annual_fee = *rng.pick(FEES);

        cards.push(CardInput {
            id: card_id.clone(),
            name: format!("Synthetic Card {i}"),
            issuer_id: rng.pick(ISSUERS).to_string(),
            annual_fee,
            default_earn_rate: *rng.pick(&[1.0, 1.0, 1.5, 2.0]),
            primary_currency_id: primary.to_string(),
            secondary_currency_id: secondary,
            default_perks_value: if annual_fee > 0.0 { round2(annual_fee * rng.range_f64(0.0, 0.8)) } else { 0.0 },
            exclude_from_recommendations: rng.chance(0.1),
        });

        let rule_count = rng.next_u64_below(4);
        for r in 0..rule_count {
            let category_id = rng.pick(&eligible).to_string();
            let has_cap = rng.chance(0.4);
            let booking_method = if category_id == "hotels" || category_id == "airfare" {
                *rng.pick(&[BookingMethod::Any, BookingMethod::Portal, BookingMethod::Direct, BookingMethod::Brand])
            } else {
                BookingMethod::Any
            };
            earning_rules.push(EarningRuleInput {
                id: format!("{card_id}-rule-{r}"),
                card_id: card_id.clone(),
                category_id,
                rate: round2(rng.range_f64(2.0, 5.0)),
                has_cap,
                cap_amount: has_cap.then(|| (1 + rng.next_u64_below(6)) as f64 * 500.0),
                cap_period: *rng.pick(CAP_PERIODS),
                cap_unit: if rng.chance(0.2) { CapUnit::Rewards } else { CapUnit::Spend },
                post_cap_rate: (has_cap && rng.chance(0.5)).then_some(1.0),
                booking_method,
                brand_name: (booking_method == BookingMethod::Brand).then(|| rng.pick(BRANDS).to_string()),
            });
        }

        if rng.chance(0.5) {
            let size = 2 + rng.next_u64_below(3) as usize;
            let mut members: Vec<String> = Vec::new();
            while members.len() < size {
                let pick = rng.pick(&eligible).to_string();
                if !members.contains(&pick) {
                    members.push(pick);
                }
            }
            category_bonuses.push(CategoryBonusInput {
                id: format!("{card_id}-bonus"),
                card_id: card_id.clone(),
                name: format!("Card {i} bonus"),
                rate: round2(rng.range_f64(3.0, 6.0)),
                cap_type: *rng.pick(CAP_TYPES),
                category_ids: members,
                cap_amount: rng.chance(0.8).then(|| (1 + rng.next_u64_below(4)) as f64 * 500.0),
                cap_period: *rng.pick(CAP_PERIODS),
                cap_unit: CapUnit::Spend,
                post_cap_rate: rng.chance(0.3).then_some(1.0),
            });
        }

        if rng.chance(0.25) {
            earning_rules.push(EarningRuleInput {
                id: format!("{card_id}-large"),
                card_id: card_id.clone(),
                category_id: "large-purchases".into(),
                rate: 1.5 + rng.next_u64_below(2) as f64 * 0.5,
                has_cap: rng.chance(0.5),
                cap_amount: Some(20_000.0),
                cap_period: CapPeriod::Annually,
                cap_unit: CapUnit::Spend,
                post_cap_rate: None,
                booking_method: BookingMethod::Any,
                brand_name: None,
            });
        }
    }

    ReferenceData {
        currencies,
        categories,
        cards,
        earning_rules,
        category_bonuses,
    }
}

pub fn synthetic_portfolio(seed: u64, reference: &ReferenceData) -> UserPortfolio {
    let mut rng = SampleRng::new(seed, SampleStream::Portfolio);
    let mut spend_rng = SampleRng::new(seed, SampleStream::Spending);

    let held_count = 1 + rng.next_u64_below(4u64.min(reference.cards.len() as u64)) as usize;
    let mut held_card_ids: Vec<String> = Vec::new();
    while held_card_ids.len() < held_count {
        let id = rng.pick(&reference.cards).id.clone();
        if !held_card_ids.contains(&id) {
            held_card_ids.push(id);
        }
    }

    let mut spending = Vec::new();
    for (id, _, _, _, median) in CATEGORIES.iter().filter(|c| c.4 > 0.0) {
        if !spend_rng.chance(0.85) {
            continue;
        }
        let dollars = spend_rng.pareto(median * 0.5, 2.5).min(median * 6.0);
        let annual_spend_cents = (dollars * 100.0).round() as i64;
        let large_purchase_spend_cents = if spend_rng.chance(0.1) {
            (annual_spend_cents as f64 * spend_rng.range_f64(0.1, 0.6)).round() as i64
        } else {
            0
        };
        spending.push(CategorySpending {
            category_id: id.to_string(),
            annual_spend_cents,
            large_purchase_spend_cents,
        });
    }

    let mut portfolio = UserPortfolio {
        held_card_ids,
        spending,
        earnings_goal: *rng.pick(&[EarningsGoal::Maximize, EarningsGoal::Maximize, EarningsGoal::CashOnly, EarningsGoal::PointsOnly]),
        ..UserPortfolio::default()
    };

    for card in &reference.cards {
        if !portfolio.holds(&card.id) {
            continue;
        }
        if card.secondary_currency_id.is_some() && rng.chance(0.7) {
            portfolio.enabled_secondary_cards.insert(card.id.clone());
        }
        if rng.chance(0.1) {
            portfolio.debit_pay_values.insert(card.id.clone(), 0.5);
        }
        if card.annual_fee > 0.0 && rng.chance(0.3) {
            portfolio.perks_values.insert(card.id.clone(), round2(card.annual_fee * rng.range_f64(0.0, 1.2)));
        }
    }

    for bonus in &reference.category_bonuses {
        if bonus.cap_type == CapType::SelectedCategory && portfolio.holds(&bonus.card_id) && rng.chance(0.8) {
            portfolio.bonus_selections.insert(bonus.id.clone(), rng.pick(&bonus.category_ids).clone());
        }
    }

    if rng.chance(0.5) {
        portfolio.user_currency_values.insert("flex".into(), round2(rng.range_f64(1.0, 2.2)));
    }
    if rng.chance(0.3) {
        portfolio.multiplier_programs.push(MultiplierProgram {
            id: "relationship".into(),
            name: "Relationship Bonus".into(),
            multiplier: 1.25,
            currency_ids: vec!["flex".into()],
            card_ids: vec![],
        });
    }
    if rng.chance(0.6) {
        let preference_type = *rng.pick(&[TravelPreferenceType::Portal, TravelPreferenceType::Direct, TravelPreferenceType::Brand]);
        portfolio.travel_preferences.push(TravelPreference {
            category_slug: "hotels".into(),
            preference_type,
            brand_name: (preference_type == TravelPreferenceType::Brand).then(|| rng.pick(BRANDS).to_string()),
            portal_issuer_id: None,
        });
    }

    portfolio
}
