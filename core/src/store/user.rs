//! User portfolio reads and writes.

use super::{bool_to_sql, enum_from_sql, enum_to_sql, json_from_sql, RewardsStore};
use crate::{
    error::{CalcError, CalcResult},
    portfolio::{CategorySpending, EarningsGoal, MultiplierProgram, TravelPreference, UserPortfolio},
};
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;

/// Per-card settings stored alongside a held card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserCardSettings {
    pub perks_value: Option<f64>,
    pub debit_pay_percent: Option<f64>,
    pub secondary_enabled: bool,
}

impl RewardsStore {
    // ── Users ──────────────────────────────────────────────────

    pub fn insert_user(
        &self,
        user_id: &str,
        goal: EarningsGoal,
        selected_template_id: Option<&str>,
    ) -> CalcResult<()> {
        self.conn.execute(
            "INSERT INTO app_user (user_id, earnings_goal, selected_template_id)
             VALUES (?1, ?2, ?3)",
            params![user_id, goal.as_str(), selected_template_id],
        )?;
        Ok(())
    }

    pub fn set_earnings_goal(&self, user_id: &str, goal: EarningsGoal) -> CalcResult<()> {
        let updated = self.conn.execute(
            "UPDATE app_user SET earnings_goal = ?1 WHERE user_id = ?2",
            params![goal.as_str(), user_id],
        )?;
        if updated == 0 {
            return Err(CalcError::UnknownUser { user_id: user_id.to_string() });
        }
        Ok(())
    }

    // ── Holdings and spend ─────────────────────────────────────

    /// Held cards keep the order they were added in.
    pub fn add_user_card(&self, user_id: &str, card_id: &str, settings: &UserCardSettings) -> CalcResult<()> {
        self.conn.execute(
            "INSERT INTO user_card (
                user_id, card_id, position, perks_value, debit_pay_percent, secondary_enabled
            ) VALUES (
                ?1, ?2, (SELECT COALESCE(MAX(position) + 1, 0) FROM user_card WHERE user_id = ?1), ?3, ?4, ?5
            )",
            params![
                user_id,
                card_id,
                settings.perks_value,
                settings.debit_pay_percent,
                bool_to_sql(settings.secondary_enabled),
            ],
        )?;
        Ok(())
    }

    pub fn remove_user_card(&self, user_id: &str, card_id: &str) -> CalcResult<()> {
        self.conn.execute(
            "DELETE FROM user_card WHERE user_id = ?1 AND card_id = ?2",
            params![user_id, card_id],
        )?;
        Ok(())
    }

    /// Insert or replace the spend for one category.
    pub fn upsert_spending(&self, user_id: &str, s: &CategorySpending) -> CalcResult<()> {
        if s.annual_spend_cents < 0 || s.large_purchase_spend_cents < 0 {
            return Err(CalcError::InvalidInput {
                reason: format!("negative spend for category {}", s.category_id),
            });
        }
        self.conn.execute(
            "INSERT INTO user_spending (user_id, category_id, annual_spend_cents, large_purchase_spend_cents)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, category_id) DO UPDATE SET
                annual_spend_cents = excluded.annual_spend_cents,
                large_purchase_spend_cents = excluded.large_purchase_spend_cents",
            params![user_id, s.category_id, s.annual_spend_cents, s.large_purchase_spend_cents],
        )?;
        Ok(())
    }

    // ── Preferences ────────────────────────────────────────────

    pub fn set_currency_value(&self, user_id: &str, currency_id: &str, value_cents: f64) -> CalcResult<()> {
        self.conn.execute(
            "INSERT INTO user_currency_value (user_id, currency_id, value_cents)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, currency_id) DO UPDATE SET value_cents = excluded.value_cents",
            params![user_id, currency_id, value_cents],
        )?;
        Ok(())
    }

    pub fn insert_multiplier_program(&self, user_id: &str, p: &MultiplierProgram) -> CalcResult<()> {
        self.conn.execute(
            "INSERT INTO user_multiplier_program (
                user_id, program_id, name, multiplier, currency_ids, card_ids
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                p.id,
                p.name,
                p.multiplier,
                serde_json::to_string(&p.currency_ids)?,
                serde_json::to_string(&p.card_ids)?,
            ],
        )?;
        Ok(())
    }

    pub fn insert_travel_preference(&self, user_id: &str, t: &TravelPreference) -> CalcResult<()> {
        self.conn.execute(
            "INSERT INTO user_travel_preference (
                user_id, category_slug, preference_type, brand_name, portal_issuer_id
            ) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                t.category_slug,
                enum_to_sql(&t.preference_type)?,
                t.brand_name,
                t.portal_issuer_id,
            ],
        )?;
        Ok(())
    }

    pub fn set_bonus_selection(&self, user_id: &str, bonus_id: &str, category_id: &str) -> CalcResult<()> {
        self.conn.execute(
            "INSERT INTO user_bonus_selection (user_id, bonus_id, category_id)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, bonus_id) DO UPDATE SET category_id = excluded.category_id",
            params![user_id, bonus_id, category_id],
        )?;
        Ok(())
    }

    /// Store every user-owned part of a portfolio under a new user.
    /// Template and cash-out values are catalog data and are not written.
    pub fn save_portfolio(&self, user_id: &str, p: &UserPortfolio) -> CalcResult<()> {
        p.validate()?;
        self.insert_user(user_id, p.earnings_goal, None)?;
        for card_id in &p.held_card_ids {
            let settings = UserCardSettings {
                perks_value: p.perks_values.get(card_id).copied(),
                debit_pay_percent: p.debit_pay_values.get(card_id).copied(),
                secondary_enabled: p.enabled_secondary_cards.contains(card_id),
            };
            self.add_user_card(user_id, card_id, &settings)?;
        }
        for s in &p.spending {
            self.upsert_spending(user_id, s)?;
        }
        for (currency_id, value) in &p.user_currency_values {
            self.set_currency_value(user_id, currency_id, *value)?;
        }
        for program in &p.multiplier_programs {
            self.insert_multiplier_program(user_id, program)?;
        }
        for pref in &p.travel_preferences {
            self.insert_travel_preference(user_id, pref)?;
        }
        for (bonus_id, category_id) in &p.bonus_selections {
            self.set_bonus_selection(user_id, bonus_id, category_id)?;
        }
        log::debug!(
            "store: saved portfolio for {user_id} ({} cards, {} categories)",
            p.held_card_ids.len(),
            p.spending.len()
        );
        Ok(())
    }

    // ── Assembly ───────────────────────────────────────────────

    /// Build the calculator input for `user_id`. Template values land in
    /// `default_currency_values`, currency cash-out rates in `cash_out_values`.
    pub fn load_portfolio(&self, user_id: &str) -> CalcResult<UserPortfolio> {
        let user: Option<(String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT earnings_goal, selected_template_id FROM app_user WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((goal, template_id)) = user else {
            return Err(CalcError::UnknownUser { user_id: user_id.to_string() });
        };

        let earnings_goal = EarningsGoal::parse(&goal).unwrap_or_else(|| {
            log::warn!("store: user {user_id} has unknown earnings goal {goal:?}; using maximize");
            EarningsGoal::Maximize
        });

        let mut portfolio = UserPortfolio {
            earnings_goal,
            ..UserPortfolio::default()
        };

        let mut stmt = self.conn.prepare(
            "SELECT card_id, perks_value, debit_pay_percent, secondary_enabled
             FROM user_card WHERE user_id = ?1 ORDER BY position, rowid",
        )?;
        let cards = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, i64>(3)? != 0,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (card_id, perks, debit_pay, secondary) in cards {
            if let Some(v) = perks {
                portfolio.perks_values.insert(card_id.clone(), v);
            }
            if let Some(v) = debit_pay {
                portfolio.debit_pay_values.insert(card_id.clone(), v);
            }
            if secondary {
                portfolio.enabled_secondary_cards.insert(card_id.clone());
            }
            portfolio.held_card_ids.push(card_id);
        }

        let mut stmt = self.conn.prepare(
            "SELECT category_id, annual_spend_cents, large_purchase_spend_cents
             FROM user_spending WHERE user_id = ?1 ORDER BY rowid",
        )?;
        portfolio.spending = stmt
            .query_map(params![user_id], |row| {
                Ok(CategorySpending {
                    category_id: row.get(0)?,
                    annual_spend_cents: row.get(1)?,
                    large_purchase_spend_cents: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT currency_id, value_cents FROM user_currency_value WHERE user_id = ?1",
        )?;
        portfolio.user_currency_values = stmt
            .query_map(params![user_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT program_id, name, multiplier, currency_ids, card_ids
             FROM user_multiplier_program WHERE user_id = ?1 ORDER BY rowid",
        )?;
        portfolio.multiplier_programs = stmt
            .query_map(params![user_id], |row| {
                Ok(MultiplierProgram {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    multiplier: row.get(2)?,
                    currency_ids: json_from_sql(3, &row.get::<_, String>(3)?)?,
                    card_ids: json_from_sql(4, &row.get::<_, String>(4)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT category_slug, preference_type, brand_name, portal_issuer_id
             FROM user_travel_preference WHERE user_id = ?1 ORDER BY rowid",
        )?;
        portfolio.travel_preferences = stmt
            .query_map(params![user_id], |row| {
                Ok(TravelPreference {
                    category_slug: row.get(0)?,
                    preference_type: enum_from_sql(1, row.get(1)?)?,
                    brand_name: row.get(2)?,
                    portal_issuer_id: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT bonus_id, category_id FROM user_bonus_selection WHERE user_id = ?1",
        )?;
        portfolio.bonus_selections = stmt
            .query_map(params![user_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;

        if let Some(template_id) = template_id {
            portfolio.default_currency_values = self.template_values(&template_id)?;
        }
        portfolio.cash_out_values = self.cash_out_values()?;

        Ok(portfolio)
    }
}
