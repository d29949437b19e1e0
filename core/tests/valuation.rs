use returns_core::{
    calculator::calculate_returns,
    catalog::{
        BookingMethod, CapPeriod, CapUnit, CardInput, Category, Currency, CurrencyType,
        EarningRuleInput, ReferenceData,
    },
    config::CalcConfig,
    portfolio::{CategorySpending, EarningsGoal, MultiplierProgram, UserPortfolio},
};

// ── Test helpers ─────────────────────────────────────────────────

fn currency(id: &str, kind: CurrencyType, base: f64, cash_out: Option<f64>) -> Currency {
    Currency {
        id: id.into(),
        name: id.into(),
        currency_type: kind,
        base_value_cents: Some(base),
        cash_out_value_cents: cash_out,
    }
}

fn card(id: &str, rate: f64, primary: &str, secondary: Option<&str>) -> CardInput {
    CardInput {
        id: id.into(),
        name: id.into(),
        issuer_id: "bank".into(),
        annual_fee: 0.0,
        default_earn_rate: rate,
        primary_currency_id: primary.into(),
        secondary_currency_id: secondary.map(Into::into),
        default_perks_value: 0.0,
        exclude_from_recommendations: false,
    }
}

fn reference() -> ReferenceData {
    ReferenceData {
        currencies: vec![
            currency("cash", CurrencyType::Cashback, 1.0, Some(1.0)),
            currency("ur", CurrencyType::TransferablePoints, 1.5, Some(1.0)),
            currency("miles", CurrencyType::AirlineMiles, 1.2, None),
        ],
        categories: vec![Category {
            id: "dining".into(),
            name: "Dining".into(),
            slug: "dining".into(),
            parent_id: None,
            excluded_by_default: false,
        }],
        cards: vec![
            card("cash2", 2.0, "cash", None),
            card("cash15", 1.5, "cash", Some("ur")),
            card("sapphire", 1.0, "ur", None),
            card("airline", 2.0, "miles", None),
        ],
        earning_rules: vec![EarningRuleInput {
            id: "sapphire-dining".into(),
            card_id: "sapphire".into(),
            category_id: "dining".into(),
            rate: 3.0,
            has_cap: false,
            cap_amount: None,
            cap_period: CapPeriod::Annually,
            cap_unit: CapUnit::Spend,
            post_cap_rate: None,
            booking_method: BookingMethod::Any,
            brand_name: None,
        }],
        category_bonuses: vec![],
    }
}

fn portfolio(held: &[&str], goal: EarningsGoal) -> UserPortfolio {
    UserPortfolio {
        held_card_ids: held.iter().map(|s| s.to_string()).collect(),
        spending: vec![CategorySpending::new("dining", 100_000)],
        earnings_goal: goal,
        ..UserPortfolio::default()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[test]
fn cash_only_is_neutral_for_an_all_cash_portfolio() {
    let reference = reference();
    let config = CalcConfig::default();
    let max = calculate_returns(&reference, &portfolio(&["cash2"], EarningsGoal::Maximize), &config).unwrap();
    let cash = calculate_returns(&reference, &portfolio(&["cash2"], EarningsGoal::CashOnly), &config).unwrap();

    assert!((max.total_value - cash.total_value).abs() < 1e-9);
    assert!((cash.total_value - 20.0).abs() < 1e-9);
    assert_eq!(cash.earnings_goal, EarningsGoal::CashOnly);
}

#[test]
fn cash_only_values_points_at_cash_out_rate() {
    let reference = reference();
    let config = CalcConfig::default();
    let returns = calculate_returns(&reference, &portfolio(&["sapphire"], EarningsGoal::CashOnly), &config).unwrap();

    // 3,000 points at 1.0¢ cash-out instead of 1.5¢.
    assert!((returns.total_value - 30.0).abs() < 1e-9);
    assert!((returns.currency("ur").unwrap().value_per_point_cents - 1.0).abs() < 1e-9);
}

#[test]
fn cash_only_without_cash_out_value_is_worth_nothing() {
    let reference = reference();
    let config = CalcConfig::default();
    let returns = calculate_returns(&reference, &portfolio(&["airline"], EarningsGoal::CashOnly), &config).unwrap();

    assert_eq!(returns.total_value, 0.0);
    assert!((returns.card("airline").unwrap().points_earned - 2_000.0).abs() < 1e-9);
}

#[test]
fn points_only_zeroes_cash_back_and_moves_spend_to_points() {
    let reference = reference();
    let config = CalcConfig::default();
    let returns = calculate_returns(
        &reference,
        &portfolio(&["cash2", "airline"], EarningsGoal::PointsOnly),
        &config,
    )
    .unwrap();

    assert_eq!(returns.category("dining").unwrap().allocations[0].card_id, "airline");
    assert_eq!(returns.cashback_value, 0.0);
    assert!((returns.points_value - 24.0).abs() < 1e-9);
}

#[test]
fn maximize_prefers_higher_valued_points() {
    let reference = reference();
    let config = CalcConfig::default();
    let returns = calculate_returns(&reference, &portfolio(&["cash2", "sapphire"], EarningsGoal::Maximize), &config).unwrap();

    // 3x at 1.5¢ beats 2% cash.
    assert_eq!(returns.category("dining").unwrap().allocations[0].card_id, "sapphire");
    assert!((returns.total_value - 45.0).abs() < 1e-9);
}

#[test]
fn user_override_beats_currency_base_value() {
    let reference = reference();
    let config = CalcConfig::default();
    let mut p = portfolio(&["sapphire"], EarningsGoal::Maximize);
    p.default_currency_values.insert("ur".into(), 1.8);
    p.user_currency_values.insert("ur".into(), 2.0);
    let returns = calculate_returns(&reference, &p, &config).unwrap();
    assert!((returns.total_value - 60.0).abs() < 1e-9);

    p.user_currency_values.clear();
    let returns = calculate_returns(&reference, &p, &config).unwrap();
    assert!((returns.total_value - 54.0).abs() < 1e-9);
}

#[test]
fn secondary_currency_needs_partner_card_and_opt_in() {
    let reference = reference();
    let config = CalcConfig::default();
    let everything_else = |held: &[&str], enabled: bool| {
        let mut p = UserPortfolio {
            held_card_ids: held.iter().map(|s| s.to_string()).collect(),
            spending: vec![CategorySpending::new("groceries", 100_000)],
            ..UserPortfolio::default()
        };
        if enabled {
            p.enabled_secondary_cards.insert("cash15".into());
        }
        calculate_returns(&reference, &p, &config).unwrap()
    };

    // Opted in, partner held: 1.5x earns UR worth 1.5¢.
    let returns = everything_else(&["cash15", "sapphire"], true);
    let card = returns.card("cash15").unwrap();
    assert_eq!(card.currency_id, "ur");
    assert!((returns.total_value - 22.5).abs() < 1e-9);

    // Partner held but not opted in: cash.
    let returns = everything_else(&["cash15", "sapphire"], false);
    assert_eq!(returns.card("cash15").unwrap().currency_id, "cash");
    assert!((returns.total_value - 15.0).abs() < 1e-9);

    // Opted in without the partner: cash.
    let returns = everything_else(&["cash15"], true);
    assert_eq!(returns.card("cash15").unwrap().currency_id, "cash");
}

#[test]
fn multiplier_programs_compound() {
    let reference = reference();
    let config = CalcConfig::default();
    let mut p = portfolio(&["sapphire"], EarningsGoal::Maximize);
    p.multiplier_programs = vec![
        MultiplierProgram {
            id: "relationship".into(),
            name: "Relationship".into(),
            multiplier: 1.25,
            currency_ids: vec!["ur".into()],
            card_ids: vec![],
        },
        MultiplierProgram {
            id: "elite".into(),
            name: "Elite".into(),
            multiplier: 2.0,
            currency_ids: vec![],
            card_ids: vec!["sapphire".into()],
        },
    ];
    let returns = calculate_returns(&reference, &p, &config).unwrap();

    assert!((returns.card("sapphire").unwrap().points_earned - 7_500.0).abs() < 1e-9);
    assert!((returns.total_value - 112.5).abs() < 1e-9);
}

#[test]
fn debit_pay_adds_cash_on_top_of_rewards() {
    let reference = reference();
    let config = CalcConfig::default();
    let mut p = portfolio(&["cash2"], EarningsGoal::Maximize);
    p.debit_pay_values.insert("cash2".into(), 0.5);
    let returns = calculate_returns(&reference, &p, &config).unwrap();

    assert!((returns.debit_pay_value - 5.0).abs() < 1e-9);
    assert!((returns.total_value - 25.0).abs() < 1e-9);

    p.earnings_goal = EarningsGoal::PointsOnly;
    let returns = calculate_returns(&reference, &p, &config).unwrap();
    assert_eq!(returns.debit_pay_value, 0.0);
}

#[test]
fn currency_breakdown_adds_up_to_rewards_value() {
    let reference = reference();
    let config = CalcConfig::default();
    let mut p = portfolio(&["cash2", "sapphire"], EarningsGoal::Maximize);
    p.spending.push(CategorySpending::new("groceries", 50_000));
    let returns = calculate_returns(&reference, &p, &config).unwrap();

    let by_currency: f64 = returns.currency_breakdown.iter().map(|c| c.value).sum();
    assert!((by_currency - (returns.cashback_value + returns.points_value)).abs() < 1e-9);
    assert!((returns.total_value - (returns.cashback_value + returns.points_value + returns.debit_pay_value)).abs() < 1e-9);
}
