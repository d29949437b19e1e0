//! returns-runner: headless portfolio returns calculator.
//!
//! Usage:
//!   returns-runner --data-dir ./data --portfolio ./data/portfolios/example.json
//!   returns-runner --db rewards.db --user u-1 --recommend --save
//!   returns-runner --synthetic --seed 7 --json
//!   returns-runner --data-dir ./data --ipc-mode

use anyhow::{Context, Result};
use returns_core::{
    calculator::ReturnsCalculator,
    catalog::ReferenceData,
    config::CalcConfig,
    portfolio::UserPortfolio,
    recommendation::CardRecommendation,
    returns::PortfolioReturns,
    sample,
    store::RewardsStore,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    /// Optional `portfolio` replaces the loaded one for this and later commands.
    Calculate {
        #[serde(default)]
        portfolio: Option<UserPortfolio>,
    },
    Recommend {
        #[serde(default)]
        portfolio: Option<UserPortfolio>,
    },
    GetConfig,
    Quit,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct RunOutput<'a> {
    returns: &'a PortfolioReturns,
    #[serde(skip_serializing_if = "Option::is_none")]
    recommendations: Option<&'a [CardRecommendation]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<String>,
}

/// Where the catalog and portfolio came from.
enum Source {
    Files,
    Database { store: RewardsStore, user_id: String },
    Synthetic { seed: u64 },
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let synthetic = args.iter().any(|a| a == "--synthetic");
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let want_recommend = args.iter().any(|a| a == "--recommend");
    let json = args.iter().any(|a| a == "--json");
    let save = args.iter().any(|a| a == "--save");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let db = flag_value(&args, "--db");
    let user = flag_value(&args, "--user");
    let default_portfolio = format!("{data_dir}/portfolios/example.json");
    let portfolio_path = flag_value(&args, "--portfolio").unwrap_or(&default_portfolio);

    let config = load_config(data_dir)?;

    let source = match (synthetic, db, user) {
        (true, _, _) => Source::Synthetic { seed },
        (false, Some(db), Some(user)) => {
            let store = RewardsStore::open(db).with_context(|| format!("Cannot open {db}"))?;
            store.migrate()?;
            Source::Database { store, user_id: user.to_string() }
        }
        (false, Some(_), None) => anyhow::bail!("--db needs --user"),
        _ => Source::Files,
    };

    let (reference, mut portfolio) = match &source {
        Source::Synthetic { seed } => {
            let scenario = sample::synthetic_scenario(*seed);
            (scenario.reference, scenario.portfolio)
        }
        Source::Database { store, user_id } => (store.load_reference_data()?, store.load_portfolio(user_id)?),
        Source::Files => (ReferenceData::load(data_dir)?, load_portfolio_file(portfolio_path)?),
    };

    if !ipc_mode && !json {
        println!("Rewards returns runner");
        match &source {
            Source::Synthetic { seed } => println!("  source:    synthetic (seed {seed})"),
            Source::Database { user_id, .. } => println!("  source:    {} (user {user_id})", db.unwrap_or_default()),
            Source::Files => println!("  source:    {data_dir} + {portfolio_path}"),
        }
        println!("  cards:     {} in catalog, {} held", reference.cards.len(), portfolio.held_card_ids.len());
        println!("  at:        {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
        println!();
    }

    if ipc_mode {
        return run_ipc_loop(&reference, &mut portfolio, &config);
    }

    let calc = ReturnsCalculator::new(&reference, &portfolio, &config)?;
    let returns = calc.calculate();
    let recommendations = want_recommend.then(|| calc.recommend());

    let run_id = match (&source, save) {
        (Source::Database { store, user_id }, true) => Some(store.save_calculation(user_id, &returns)?),
        (_, true) => {
            log::warn!("--save ignored: results are only stored with --db");
            None
        }
        _ => None,
    };

    if json {
        let output = RunOutput {
            returns: &returns,
            recommendations: recommendations.as_deref(),
            run_id,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&returns, recommendations.as_deref(), run_id.as_deref());
    }
    Ok(())
}

fn run_ipc_loop(reference: &ReferenceData, portfolio: &mut UserPortfolio, config: &CalcConfig) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                reply_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        match handle_command(reference, portfolio, config, cmd)? {
            Some(reply) => writeln!(stdout, "{reply}")?,
            None => break,
        }
        stdout.flush()?;
    }
    Ok(())
}

/// Answer one IPC command. `None` means quit.
///
/// RULE: a replacement portfolio is only kept once it validates, so a bad
/// update never poisons later commands.
fn handle_command(
    reference: &ReferenceData,
    portfolio: &mut UserPortfolio,
    config: &CalcConfig,
    cmd: IpcCommand,
) -> Result<Option<serde_json::Value>> {
    let (update, recommend) = match cmd {
        IpcCommand::Quit => return Ok(None),
        IpcCommand::GetConfig => return Ok(Some(serde_json::to_value(config)?)),
        IpcCommand::Calculate { portfolio } => (portfolio, false),
        IpcCommand::Recommend { portfolio } => (portfolio, true),
    };

    if let Some(p) = update {
        if let Err(e) = p.validate() {
            return Ok(Some(error_reply(&e.to_string())));
        }
        *portfolio = p;
    }

    let reply = match ReturnsCalculator::new(reference, portfolio, config) {
        Ok(calc) if recommend => serde_json::to_value(calc.recommend())?,
        Ok(calc) => serde_json::to_value(calc.calculate())?,
        Err(e) => error_reply(&e.to_string()),
    };
    Ok(Some(reply))
}

fn error_reply(message: &str) -> serde_json::Value {
    serde_json::json!({ "error": message })
}

fn reply_error(stdout: &mut io::Stdout, message: &str) -> Result<()> {
    writeln!(stdout, "{}", error_reply(message))?;
    stdout.flush()?;
    Ok(())
}

fn print_summary(returns: &PortfolioReturns, recommendations: Option<&[CardRecommendation]>, run_id: Option<&str>) {
    println!("=== PORTFOLIO RETURNS ({}) ===", returns.earnings_goal.as_str());
    println!("  total spend:     ${:.2}", returns.total_spend);
    println!("  rewards value:   ${:.2}", returns.total_value);
    println!("    cash back:     ${:.2}", returns.cashback_value);
    println!("    points:        ${:.2}", returns.points_value);
    println!("    debit pay:     ${:.2}", returns.debit_pay_value);
    println!("  annual fees:     ${:.2}", returns.total_annual_fees);
    println!("  perks:           ${:.2}", returns.total_perks_value);
    println!("  net value:       ${:.2}", returns.net_value_earned);
    println!("  net return:      {:.2}%", returns.net_return_rate);
    if let Some(run_id) = run_id {
        println!("  saved as:        {run_id}");
    }

    println!();
    println!("=== CARDS ===");
    if returns.card_breakdown.is_empty() {
        println!("  (No cards held)");
    }
    for c in &returns.card_breakdown {
        let marginal = c
            .marginal_value
            .map(|m| format!(" | Marginal: ${m:.2}"))
            .unwrap_or_default();
        println!(
            "  {} | Spend: ${:.0} | Value: ${:.2} | Net fee: ${:.2}{marginal}",
            c.card_name, c.spend, c.value, c.net_annual_fee
        );
    }

    println!();
    println!("=== CATEGORIES ===");
    for cat in &returns.category_breakdown {
        let cards: Vec<&str> = cat.allocations.iter().map(|a| a.card_name.as_str()).collect();
        println!(
            "  {} | ${:.0} | {:.2}% | {}",
            cat.category_name,
            cat.total_spend,
            cat.return_rate,
            if cards.is_empty() { "-".to_string() } else { cards.join(", ") }
        );
    }

    if let Some(recommendations) = recommendations {
        println!();
        println!("=== RECOMMENDATIONS ===");
        if recommendations.is_empty() {
            println!("  (Nothing beats the current portfolio)");
        }
        for r in recommendations {
            println!(
                "  {} | +${:.2}/yr | Fee: ${:.0} | New net: ${:.2}",
                r.card_name, r.improvement, r.annual_fee, r.new_net_value
            );
        }
    }
}

fn load_config(data_dir: &str) -> Result<CalcConfig> {
    let path = format!("{data_dir}/calculator.json");
    if std::path::Path::new(&path).exists() {
        CalcConfig::load(data_dir)
    } else {
        log::warn!("{path} not found; using default calculator config");
        Ok(CalcConfig::default())
    }
}

fn load_portfolio_file(path: &str) -> Result<UserPortfolio> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Cannot read {path}"))?;
    serde_json::from_str(&content).with_context(|| format!("Cannot parse {path}"))
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use returns_core::portfolio::CategorySpending;

    #[test]
    fn rejected_portfolio_update_keeps_the_previous_one() {
        let scenario = sample::synthetic_scenario(3);
        let config = CalcConfig::default();
        let mut portfolio = scenario.portfolio.clone();

        let mut bad = scenario.portfolio.clone();
        bad.spending.push(CategorySpending::new("dining", -500));
        let reply = handle_command(
            &scenario.reference,
            &mut portfolio,
            &config,
            IpcCommand::Calculate { portfolio: Some(bad) },
        )
        .unwrap()
        .unwrap();
        assert!(reply.get("error").is_some());
        assert_eq!(portfolio, scenario.portfolio);

        let reply = handle_command(
            &scenario.reference,
            &mut portfolio,
            &config,
            IpcCommand::Calculate { portfolio: None },
        )
        .unwrap()
        .unwrap();
        assert!(reply.get("error").is_none());
        assert!(reply.get("totalValue").is_some());
    }

    #[test]
    fn quit_ends_the_loop() {
        let scenario = sample::synthetic_scenario(1);
        let mut portfolio = scenario.portfolio.clone();
        let reply = handle_command(&scenario.reference, &mut portfolio, &CalcConfig::default(), IpcCommand::Quit).unwrap();
        assert!(reply.is_none());
    }
}
