//! Reference catalog reads and writes.

use super::{bool_to_sql, enum_from_sql, enum_to_sql, RewardsStore};
use crate::{
    catalog::{CardInput, Category, CategoryBonusInput, Currency, EarningRuleInput, ReferenceData},
    error::CalcResult,
    types::CurrencyId,
};
use rusqlite::params;
use std::collections::HashMap;

impl RewardsStore {
    // ── Writes ─────────────────────────────────────────────────

    pub fn insert_currency(&self, c: &Currency) -> CalcResult<()> {
        self.conn.execute(
            "INSERT INTO currency (currency_id, name, currency_type, base_value_cents, cash_out_value_cents)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![c.id, c.name, enum_to_sql(&c.currency_type)?, c.base_value_cents, c.cash_out_value_cents],
        )?;
        Ok(())
    }

    /// The parent, when set, must already be stored.
    pub fn insert_category(&self, c: &Category) -> CalcResult<()> {
        self.conn.execute(
            "INSERT INTO category (category_id, name, slug, parent_id, excluded_by_default)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![c.id, c.name, c.slug, c.parent_id, bool_to_sql(c.excluded_by_default)],
        )?;
        Ok(())
    }

    pub fn insert_card(&self, c: &CardInput) -> CalcResult<()> {
        self.conn.execute(
            "INSERT INTO card (
                card_id, name, issuer_id, annual_fee, default_earn_rate,
                primary_currency_id, secondary_currency_id, default_perks_value,
                exclude_from_recommendations
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                c.id,
                c.name,
                c.issuer_id,
                c.annual_fee,
                c.default_earn_rate,
                c.primary_currency_id,
                c.secondary_currency_id,
                c.default_perks_value,
                bool_to_sql(c.exclude_from_recommendations),
            ],
        )?;
        Ok(())
    }

    pub fn insert_earning_rule(&self, r: &EarningRuleInput) -> CalcResult<()> {
        self.conn.execute(
            "INSERT INTO earning_rule (
                rule_id, card_id, category_id, rate, has_cap, cap_amount,
                cap_period, cap_unit, post_cap_rate, booking_method, brand_name
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                r.id,
                r.card_id,
                r.category_id,
                r.rate,
                bool_to_sql(r.has_cap),
                r.cap_amount,
                enum_to_sql(&r.cap_period)?,
                enum_to_sql(&r.cap_unit)?,
                r.post_cap_rate,
                enum_to_sql(&r.booking_method)?,
                r.brand_name,
            ],
        )?;
        Ok(())
    }

    pub fn insert_category_bonus(&self, b: &CategoryBonusInput) -> CalcResult<()> {
        self.conn.execute(
            "INSERT INTO category_bonus (
                bonus_id, card_id, name, rate, cap_type, cap_amount,
                cap_period, cap_unit, post_cap_rate
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                b.id,
                b.card_id,
                b.name,
                b.rate,
                enum_to_sql(&b.cap_type)?,
                b.cap_amount,
                enum_to_sql(&b.cap_period)?,
                enum_to_sql(&b.cap_unit)?,
                b.post_cap_rate,
            ],
        )?;
        for (position, category_id) in b.category_ids.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO category_bonus_category (bonus_id, category_id, position)
                 VALUES (?1, ?2, ?3)",
                params![b.id, category_id, position as i64],
            )?;
        }
        Ok(())
    }

    pub fn insert_valuation_template(
        &self,
        template_id: &str,
        name: &str,
        values: &HashMap<CurrencyId, f64>,
    ) -> CalcResult<()> {
        self.conn.execute(
            "INSERT INTO valuation_template (template_id, name) VALUES (?1, ?2)",
            params![template_id, name],
        )?;
        for (currency_id, value_cents) in values {
            self.conn.execute(
                "INSERT INTO valuation_template_value (template_id, currency_id, value_cents)
                 VALUES (?1, ?2, ?3)",
                params![template_id, currency_id, value_cents],
            )?;
        }
        Ok(())
    }

    /// Store a whole catalog in one transaction. Categories are written
    /// before their parents are linked, so file order does not matter.
    pub fn insert_reference_data(&self, data: &ReferenceData) -> CalcResult<()> {
        self.conn.execute_batch("BEGIN")?;
        match self.insert_reference_rows(data) {
            Ok(()) => {
                self.conn.execute_batch("COMMIT")?;
                log::info!(
                    "store: catalog saved ({} cards, {} categories, {} rules, {} bonuses)",
                    data.cards.len(),
                    data.categories.len(),
                    data.earning_rules.len(),
                    data.category_bonuses.len()
                );
                Ok(())
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    fn insert_reference_rows(&self, data: &ReferenceData) -> CalcResult<()> {
        for c in &data.currencies {
            self.insert_currency(c)?;
        }
        for c in &data.categories {
            self.insert_category(&Category { parent_id: None, ..c.clone() })?;
        }
        for c in data.categories.iter().filter(|c| c.parent_id.is_some()) {
            self.conn.execute(
                "UPDATE category SET parent_id = ?1 WHERE category_id = ?2",
                params![c.parent_id, c.id],
            )?;
        }
        for c in &data.cards {
            self.insert_card(c)?;
        }
        for r in &data.earning_rules {
            self.insert_earning_rule(r)?;
        }
        for b in &data.category_bonuses {
            self.insert_category_bonus(b)?;
        }
        Ok(())
    }

    // ── Reads ──────────────────────────────────────────────────

    /// The whole catalog, each table in insertion order.
    pub fn load_reference_data(&self) -> CalcResult<ReferenceData> {
        let currencies = self
            .conn
            .prepare(
                "SELECT currency_id, name, currency_type, base_value_cents, cash_out_value_cents
                 FROM currency ORDER BY rowid",
            )?
            .query_map([], |row| {
                Ok(Currency {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    currency_type: enum_from_sql(2, row.get(2)?)?,
                    base_value_cents: row.get(3)?,
                    cash_out_value_cents: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let categories = self
            .conn
            .prepare(
                "SELECT category_id, name, slug, parent_id, excluded_by_default
                 FROM category ORDER BY rowid",
            )?
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    slug: row.get(2)?,
                    parent_id: row.get(3)?,
                    excluded_by_default: row.get::<_, i64>(4)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let cards = self
            .conn
            .prepare(
                "SELECT card_id, name, issuer_id, annual_fee, default_earn_rate,
                        primary_currency_id, secondary_currency_id, default_perks_value,
                        exclude_from_recommendations
                 FROM card ORDER BY rowid",
            )?
            .query_map([], |row| {
                Ok(CardInput {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    issuer_id: row.get(2)?,
                    annual_fee: row.get(3)?,
                    default_earn_rate: row.get(4)?,
                    primary_currency_id: row.get(5)?,
                    secondary_currency_id: row.get(6)?,
                    default_perks_value: row.get(7)?,
                    exclude_from_recommendations: row.get::<_, i64>(8)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let earning_rules = self
            .conn
            .prepare(
                "SELECT rule_id, card_id, category_id, rate, has_cap, cap_amount,
                        cap_period, cap_unit, post_cap_rate, booking_method, brand_name
                 FROM earning_rule ORDER BY rowid",
            )?
            .query_map([], |row| {
                Ok(EarningRuleInput {
                    id: row.get(0)?,
                    card_id: row.get(1)?,
                    category_id: row.get(2)?,
                    rate: row.get(3)?,
                    has_cap: row.get::<_, i64>(4)? != 0,
                    cap_amount: row.get(5)?,
                    cap_period: enum_from_sql(6, row.get(6)?)?,
                    cap_unit: enum_from_sql(7, row.get(7)?)?,
                    post_cap_rate: row.get(8)?,
                    booking_method: enum_from_sql(9, row.get(9)?)?,
                    brand_name: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut category_bonuses = self
            .conn
            .prepare(
                "SELECT bonus_id, card_id, name, rate, cap_type, cap_amount,
                        cap_period, cap_unit, post_cap_rate
                 FROM category_bonus ORDER BY rowid",
            )?
            .query_map([], |row| {
                Ok(CategoryBonusInput {
                    id: row.get(0)?,
                    card_id: row.get(1)?,
                    name: row.get(2)?,
                    rate: row.get(3)?,
                    cap_type: enum_from_sql(4, row.get(4)?)?,
                    category_ids: Vec::new(),
                    cap_amount: row.get(5)?,
                    cap_period: enum_from_sql(6, row.get(6)?)?,
                    cap_unit: enum_from_sql(7, row.get(7)?)?,
                    post_cap_rate: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT category_id FROM category_bonus_category
             WHERE bonus_id = ?1 ORDER BY position",
        )?;
        for bonus in &mut category_bonuses {
            bonus.category_ids = stmt
                .query_map(params![bonus.id], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
        }

        Ok(ReferenceData {
            currencies,
            categories,
            cards,
            earning_rules,
            category_bonuses,
        })
    }

    /// Cents-per-point values of one valuation template.
    pub fn template_values(&self, template_id: &str) -> CalcResult<HashMap<CurrencyId, f64>> {
        let mut stmt = self.conn.prepare(
            "SELECT currency_id, value_cents FROM valuation_template_value
             WHERE template_id = ?1",
        )?;
        let values = stmt
            .query_map(params![template_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(values)
    }

    /// Cash redemption rates declared on the currencies themselves.
    pub fn cash_out_values(&self) -> CalcResult<HashMap<CurrencyId, f64>> {
        let mut stmt = self.conn.prepare(
            "SELECT currency_id, cash_out_value_cents FROM currency
             WHERE cash_out_value_cents IS NOT NULL",
        )?;
        let values = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(values)
    }
}
