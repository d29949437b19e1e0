//! Running cap consumption for one allocation pass.
//!
//! RULE: Consumption is keyed by the rule or bonus that owns the cap,
//! never by category, so a bonus spanning several categories draws
//! every category from one shared counter.
//!
//! Units:
//!   - `CapUnit::Spend`:   the counter holds cents of spend.
//!   - `CapUnit::Rewards`: the counter holds points earned at the elevated rate.

use crate::{
    catalog::{CapSpec, CapUnit},
    types::{points_for_spend, BonusId, Cents, RuleId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Owner of a cap counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CapKey {
    Rule(RuleId),
    Bonus(BonusId),
}

#[derive(Debug, Clone, Default)]
pub struct CapLedger {
    consumed: HashMap<CapKey, f64>,
}

/// Absorbs float noise when converting a fractional headroom to whole cents.
const EPSILON: f64 = 1e-6;

impl CapLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount already used, in the cap's own unit.
    pub fn consumed(&self, key: &CapKey) -> f64 {
        self.consumed.get(key).copied().unwrap_or(0.0)
    }

    /// Remaining annual allowance in the cap's own unit.
    pub fn remaining(&self, key: &CapKey, cap: &CapSpec) -> f64 {
        let limit = match cap.unit {
            CapUnit::Spend => cap.annual_amount() * 100.0,
            CapUnit::Rewards => cap.annual_amount(),
        };
        (limit - self.consumed(key)).max(0.0)
    }

    /// Cents of spend that can still earn `rate` before the cap is hit.
    pub fn spend_headroom(&self, key: &CapKey, cap: &CapSpec, rate: f64) -> Cents {
        let remaining = self.remaining(key, cap);
        let cents = match cap.unit {
            CapUnit::Spend => remaining,
            CapUnit::Rewards if rate > 0.0 => remaining * 100.0 / rate,
            CapUnit::Rewards => return Cents::MAX,
        };
        (cents + EPSILON).floor() as Cents
    }

    /// Record `spend_cents` earned at `rate` against the cap.
    pub fn consume(&mut self, key: &CapKey, cap: &CapSpec, spend_cents: Cents, rate: f64) {
        let used = match cap.unit {
            CapUnit::Spend => spend_cents as f64,
            CapUnit::Rewards => points_for_spend(spend_cents, rate),
        };
        *self.consumed.entry(key.clone()).or_insert(0.0) += used;
    }

    pub fn is_exhausted(&self, key: &CapKey, cap: &CapSpec) -> bool {
        self.remaining(key, cap) <= EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CapPeriod;

    fn spend_cap(amount: f64, period: CapPeriod) -> CapSpec {
        CapSpec { amount, period, unit: CapUnit::Spend }
    }

    #[test]
    fn spend_cap_headroom_shrinks_with_consumption() {
        let key = CapKey::Bonus("b1".into());
        let cap = spend_cap(1_500.0, CapPeriod::Quarterly);
        let mut ledger = CapLedger::new();

        assert_eq!(ledger.spend_headroom(&key, &cap, 5.0), 600_000);
        ledger.consume(&key, &cap, 450_000, 5.0);
        assert_eq!(ledger.spend_headroom(&key, &cap, 5.0), 150_000);
        ledger.consume(&key, &cap, 150_000, 5.0);
        assert!(ledger.is_exhausted(&key, &cap));
        assert_eq!(ledger.spend_headroom(&key, &cap, 5.0), 0);
    }

    #[test]
    fn rewards_cap_converts_points_to_spend() {
        let key = CapKey::Rule("r1".into());
        // 10,000 points a year at 4x → $2,500 of spend.
        let cap = CapSpec { amount: 10_000.0, period: CapPeriod::Annually, unit: CapUnit::Rewards };
        let mut ledger = CapLedger::new();
        assert_eq!(ledger.spend_headroom(&key, &cap, 4.0), 250_000);

        ledger.consume(&key, &cap, 100_000, 4.0);
        assert_eq!(ledger.consumed(&key), 4_000.0);
        assert_eq!(ledger.spend_headroom(&key, &cap, 4.0), 150_000);
    }

    #[test]
    fn counters_are_independent_per_key() {
        let cap = spend_cap(100.0, CapPeriod::Annually);
        let mut ledger = CapLedger::new();
        ledger.consume(&CapKey::Rule("a".into()), &cap, 10_000, 2.0);
        assert!(ledger.is_exhausted(&CapKey::Rule("a".into()), &cap));
        assert!(!ledger.is_exhausted(&CapKey::Bonus("a".into()), &cap));
    }
}
