use returns_core::{
    calculator::{calculate_returns, ReturnsCalculator},
    catalog::{
        BookingMethod, CapPeriod, CapUnit, CardInput, Category, Currency, CurrencyType,
        EarningRuleInput, ReferenceData,
    },
    config::CalcConfig,
    error::CalcError,
    portfolio::{CategorySpending, TravelPreference, TravelPreferenceType, UserPortfolio},
    rule_resolver::RateSource,
};

// ── Test helpers ─────────────────────────────────────────────────

fn cash() -> Currency {
    Currency {
        id: "cash".into(),
        name: "Cash Back".into(),
        currency_type: CurrencyType::Cashback,
        base_value_cents: Some(1.0),
        cash_out_value_cents: Some(1.0),
    }
}

fn category(id: &str, parent: Option<&str>) -> Category {
    Category {
        id: id.into(),
        name: id.to_uppercase(),
        slug: id.into(),
        parent_id: parent.map(Into::into),
        excluded_by_default: false,
    }
}

fn card(id: &str, default_rate: f64, fee: f64) -> CardInput {
    CardInput {
        id: id.into(),
        name: format!("{id} card"),
        issuer_id: "bank".into(),
        annual_fee: fee,
        default_earn_rate: default_rate,
        primary_currency_id: "cash".into(),
        secondary_currency_id: None,
        default_perks_value: 0.0,
        exclude_from_recommendations: false,
    }
}

fn rule(card_id: &str, category_id: &str, rate: f64) -> EarningRuleInput {
    EarningRuleInput {
        id: format!("{card_id}-{category_id}"),
        card_id: card_id.into(),
        category_id: category_id.into(),
        rate,
        has_cap: false,
        cap_amount: None,
        cap_period: CapPeriod::Annually,
        cap_unit: CapUnit::Spend,
        post_cap_rate: None,
        booking_method: BookingMethod::Any,
        brand_name: None,
    }
}

fn spend(category_id: &str, dollars: i64) -> CategorySpending {
    CategorySpending::new(category_id, dollars * 100)
}

fn portfolio(held: &[&str], spending: Vec<CategorySpending>) -> UserPortfolio {
    UserPortfolio {
        held_card_ids: held.iter().map(|s| s.to_string()).collect(),
        spending,
        ..UserPortfolio::default()
    }
}

fn reference() -> ReferenceData {
    ReferenceData {
        currencies: vec![cash()],
        categories: vec![
            category("dining", None),
            category("groceries", None),
            category("travel", None),
            category("hotels", Some("travel")),
            category("large-purchases", None),
            Category { excluded_by_default: true, ..category("rent", Some("travel")) },
        ],
        cards: vec![card("flat2", 2.0, 0.0), card("dine3", 1.0, 0.0), card("travel", 1.0, 0.0)],
        earning_rules: vec![
            rule("dine3", "dining", 3.0),
            rule("travel", "travel", 4.0),
            rule("flat2", "large-purchases", 3.0),
        ],
        category_bonuses: vec![],
    }
}

/// `reference()` plus a 10x hotels rule that only counts through the
/// issuer's portal and a 6x hotels rule for one brand.
fn booking_reference() -> ReferenceData {
    let mut reference = reference();
    reference.earning_rules.push(EarningRuleInput {
        id: "travel-hotels-portal".into(),
        booking_method: BookingMethod::Portal,
        ..rule("travel", "hotels", 10.0)
    });
    reference.earning_rules.push(EarningRuleInput {
        id: "flat2-hotels-hyatt".into(),
        booking_method: BookingMethod::Brand,
        brand_name: Some("Hyatt".into()),
        ..rule("flat2", "hotels", 6.0)
    });
    reference
}

fn preference(slug: &str, kind: TravelPreferenceType, brand: Option<&str>, issuer: Option<&str>) -> TravelPreference {
    TravelPreference {
        category_slug: slug.into(),
        preference_type: kind,
        brand_name: brand.map(Into::into),
        portal_issuer_id: issuer.map(Into::into),
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[test]
fn two_percent_card_earns_twenty_dollars_on_a_thousand() {
    let reference = reference();
    let p = portfolio(&["flat2"], vec![spend("groceries", 1_000)]);
    let returns = calculate_returns(&reference, &p, &CalcConfig::default()).unwrap();

    assert!((returns.total_value - 20.0).abs() < 1e-9);
    assert!((returns.net_return_rate - 2.0).abs() < 1e-9);
    let groceries = returns.category("groceries").unwrap();
    assert_eq!(groceries.allocations.len(), 1);
    assert_eq!(groceries.allocations[0].card_id, "flat2");
    assert!((groceries.return_rate - 2.0).abs() < 1e-9);
}

#[test]
fn each_category_goes_to_the_best_card() {
    let reference = reference();
    let p = portfolio(
        &["flat2", "dine3"],
        vec![spend("dining", 2_000), spend("groceries", 3_000)],
    );
    let returns = calculate_returns(&reference, &p, &CalcConfig::default()).unwrap();

    assert_eq!(returns.category("dining").unwrap().allocations[0].card_id, "dine3");
    assert_eq!(returns.category("groceries").unwrap().allocations[0].card_id, "flat2");
    // 2,000 × 3% + 3,000 × 2%
    assert!((returns.total_value - 120.0).abs() < 1e-9);
}

#[test]
fn allocated_spend_matches_category_spend() {
    let reference = reference();
    let p = portfolio(
        &["flat2", "dine3", "travel"],
        vec![
            spend("dining", 4_321),
            spend("hotels", 1_250),
            spend("rent", 18_000),
            spend("groceries", 777),
        ],
    );
    let returns = calculate_returns(&reference, &p, &CalcConfig::default()).unwrap();
    for category in &returns.category_breakdown {
        assert_eq!(category.allocated_cents(), category.total_spend_cents, "{}", category.category_id);
    }
    assert!((returns.total_spend - (4_321.0 + 1_250.0 + 18_000.0 + 777.0)).abs() < 1e-9);
}

#[test]
fn subcategory_inherits_parent_rule() {
    let reference = reference();
    let p = portfolio(&["flat2", "travel"], vec![spend("hotels", 1_000)]);
    let returns = calculate_returns(&reference, &p, &CalcConfig::default()).unwrap();

    let hotels = returns.category("hotels").unwrap();
    assert_eq!(hotels.allocations[0].card_id, "travel");
    assert_eq!(
        hotels.allocations[0].segments[0].source,
        RateSource::Rule("travel-travel".into())
    );
}

#[test]
fn portal_preference_on_parent_slug_unlocks_portal_rule() {
    let reference = booking_reference();
    let mut p = portfolio(&["flat2", "travel"], vec![spend("hotels", 1_000)]);
    p.travel_preferences = vec![preference("travel", TravelPreferenceType::Portal, None, Some("bank"))];
    let returns = calculate_returns(&reference, &p, &CalcConfig::default()).unwrap();

    let hotels = returns.category("hotels").unwrap();
    assert_eq!(hotels.allocations[0].card_id, "travel");
    assert_eq!(
        hotels.allocations[0].segments[0].source,
        RateSource::Rule("travel-hotels-portal".into())
    );
    assert!((hotels.value - 100.0).abs() < 1e-9);
}

#[test]
fn direct_preference_ignores_portal_rule_and_falls_back_to_parent() {
    let reference = booking_reference();
    let mut p = portfolio(&["travel"], vec![spend("hotels", 1_000)]);
    p.travel_preferences = vec![preference("travel", TravelPreferenceType::Direct, None, None)];
    let returns = calculate_returns(&reference, &p, &CalcConfig::default()).unwrap();

    let hotels = returns.category("hotels").unwrap();
    assert_eq!(
        hotels.allocations[0].segments[0].source,
        RateSource::Rule("travel-travel".into())
    );
    assert!((hotels.value - 40.0).abs() < 1e-9);
}

#[test]
fn portal_of_another_issuer_does_not_qualify() {
    let reference = booking_reference();
    let mut p = portfolio(&["travel"], vec![spend("hotels", 1_000)]);
    p.travel_preferences = vec![preference("travel", TravelPreferenceType::Portal, None, Some("other-bank"))];
    let returns = calculate_returns(&reference, &p, &CalcConfig::default()).unwrap();

    let hotels = returns.category("hotels").unwrap();
    assert_eq!(
        hotels.allocations[0].segments[0].source,
        RateSource::Rule("travel-travel".into())
    );
}

#[test]
fn brand_preference_on_own_slug_wins_over_parent_preference() {
    let reference = booking_reference();
    let mut p = portfolio(&["flat2", "travel"], vec![spend("hotels", 1_000)]);
    p.travel_preferences = vec![
        preference("travel", TravelPreferenceType::Portal, None, None),
        preference("hotels", TravelPreferenceType::Brand, Some("HYATT"), None),
    ];
    let returns = calculate_returns(&reference, &p, &CalcConfig::default()).unwrap();

    // The hotels preference governs: the brand rule (6x) qualifies, the
    // portal rule does not, so travel earns only its 4x parent rate.
    let hotels = returns.category("hotels").unwrap();
    assert_eq!(hotels.allocations[0].card_id, "flat2");
    assert_eq!(
        hotels.allocations[0].segments[0].source,
        RateSource::Rule("flat2-hotels-hyatt".into())
    );
    assert!((hotels.value - 60.0).abs() < 1e-9);
}

#[test]
fn excluded_category_does_not_inherit_parent_rule() {
    let reference = reference();
    let p = portfolio(&["travel"], vec![spend("rent", 1_000)]);
    let returns = calculate_returns(&reference, &p, &CalcConfig::default()).unwrap();

    let rent = returns.category("rent").unwrap();
    assert_eq!(rent.allocations[0].segments[0].source, RateSource::Default);
    assert!((rent.value - 10.0).abs() < 1e-9);
}

#[test]
fn large_purchase_share_uses_large_purchase_rules() {
    let reference = reference();
    let p = portfolio(
        &["flat2", "dine3"],
        vec![CategorySpending {
            category_id: "groceries".into(),
            annual_spend_cents: 1_000_000,
            large_purchase_spend_cents: 600_000,
        }],
    );
    let returns = calculate_returns(&reference, &p, &CalcConfig::default()).unwrap();
    let groceries = returns.category("groceries").unwrap();

    assert_eq!(groceries.allocations.len(), 2);
    let regular = groceries.allocations.iter().find(|a| !a.is_large_purchase).unwrap();
    let large = groceries.allocations.iter().find(|a| a.is_large_purchase).unwrap();
    assert_eq!(regular.spend_cents, 400_000);
    assert_eq!(large.spend_cents, 600_000);
    assert!((large.rate - 3.0).abs() < 1e-9);
    assert_eq!(groceries.allocated_cents(), 1_000_000);
}

#[test]
fn no_cards_leaves_spend_unallocated() {
    let reference = reference();
    let p = portfolio(&[], vec![spend("dining", 500)]);
    let returns = calculate_returns(&reference, &p, &CalcConfig::default()).unwrap();

    assert_eq!(returns.total_value, 0.0);
    assert!((returns.total_spend - 500.0).abs() < 1e-9);
    assert!(returns.category("dining").unwrap().allocations.is_empty());
    assert!(returns.card_breakdown.is_empty());
}

#[test]
fn unknown_held_card_is_skipped() {
    let reference = reference();
    let p = portfolio(&["ghost", "flat2"], vec![spend("dining", 100)]);
    let config = CalcConfig::default();
    let calc = ReturnsCalculator::new(&reference, &p, &config).unwrap();
    let held = calc.held_scenario();

    assert_eq!(held.cards.len(), 1);
    assert!(held.contains("flat2"));
    assert!((calc.calculate().total_value - 2.0).abs() < 1e-9);
}

#[test]
fn negative_spend_is_rejected() {
    let reference = reference();
    let p = portfolio(&["flat2"], vec![CategorySpending::new("dining", -100)]);
    let err = calculate_returns(&reference, &p, &CalcConfig::default()).unwrap_err();
    assert!(matches!(err, CalcError::InvalidInput { .. }));
}

#[test]
fn annual_fee_reduces_net_value() {
    let mut reference = reference();
    reference.cards.push(CardInput { default_perks_value: 20.0, ..card("premium", 3.0, 95.0) });
    let p = portfolio(&["premium"], vec![spend("groceries", 10_000)]);
    let returns = calculate_returns(&reference, &p, &CalcConfig::default()).unwrap();

    assert!((returns.total_value - 300.0).abs() < 1e-9);
    assert!((returns.net_annual_fees - 75.0).abs() < 1e-9);
    assert!((returns.net_value_earned - 225.0).abs() < 1e-9);
    assert!((returns.net_return_rate - 2.25).abs() < 1e-9);
}
