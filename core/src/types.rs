//! Shared primitive types used across the entire calculator.

/// Stable identifier of a card in the reference catalog.
pub type CardId = String;

/// Stable identifier of a spending category.
pub type CategoryId = String;

/// Stable identifier of a reward currency (points program, miles, cash back).
pub type CurrencyId = String;

/// Identifier of a card-level category bonus.
pub type BonusId = String;

/// Identifier of a per-category earning rule.
pub type RuleId = String;

/// Integer money amount in cents. Spend inputs are always cents.
pub type Cents = i64;

/// Convert cents to dollars for reporting.
pub fn cents_to_dollars(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

/// Points earned on `cents` of spend at `rate` points per dollar.
pub fn points_for_spend(cents: Cents, rate: f64) -> f64 {
    cents as f64 * rate / 100.0
}

/// Dollar value of `points` at `cents_per_point`.
pub fn points_to_dollars(points: f64, cents_per_point: f64) -> f64 {
    points * cents_per_point / 100.0
}
