//! Calculation history.

use super::RewardsStore;
use crate::{
    error::{CalcError, CalcResult},
    returns::PortfolioReturns,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension};

/// One stored calculation: when it ran and what it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationRun {
    pub run_id: String,
    pub user_id: String,
    pub calculated_at: DateTime<Utc>,
    pub returns: PortfolioReturns,
}

impl RewardsStore {
    /// Record a finished calculation. Returns the new run id.
    pub fn save_calculation(&self, user_id: &str, returns: &PortfolioReturns) -> CalcResult<String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let calculated_at = Utc::now();
        self.conn.execute(
            "INSERT INTO calculation_run (
                run_id, user_id, calculated_at, earnings_goal, total_spend, total_value,
                net_annual_fees, net_value_earned, net_return_rate, result_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                run_id,
                user_id,
                calculated_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                returns.earnings_goal.as_str(),
                returns.total_spend,
                returns.total_value,
                returns.net_annual_fees,
                returns.net_value_earned,
                returns.net_return_rate,
                serde_json::to_string(returns)?,
            ],
        )?;
        log::debug!("store: saved calculation {run_id} for {user_id}");
        Ok(run_id)
    }

    /// Most recent calculation for `user_id`, if any.
    pub fn latest_calculation(&self, user_id: &str) -> CalcResult<Option<CalculationRun>> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT run_id, calculated_at, result_json FROM calculation_run
                 WHERE user_id = ?1
                 ORDER BY calculated_at DESC, rowid DESC LIMIT 1",
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((run_id, calculated_at, result_json)) = row else {
            return Ok(None);
        };
        let calculated_at = DateTime::parse_from_rfc3339(&calculated_at)
            .map_err(|e| CalcError::InvalidInput {
                reason: format!("run {run_id} has a bad timestamp {calculated_at:?}: {e}"),
            })?
            .with_timezone(&Utc);
        Ok(Some(CalculationRun {
            run_id,
            user_id: user_id.to_string(),
            calculated_at,
            returns: serde_json::from_str(&result_json)?,
        }))
    }

    pub fn calculation_count(&self, user_id: &str) -> CalcResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM calculation_run WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
