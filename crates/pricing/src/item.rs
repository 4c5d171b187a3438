//! Line items and their per-item financial breakdown.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billquill_core::{ValueObject, round2};

/// A single priced line on a quotation or invoice.
///
/// Items are owned by exactly one document and become immutable once the
/// document leaves `Draft`. The withholding fields are only meaningful on
/// invoices; quotations carry them untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit_cost: Decimal,
    /// Item-level discount, 0-100. Annotates the item's own breakdown only;
    /// document totals are computed from the undiscounted amount.
    #[serde(default)]
    pub discount_percent: Option<Decimal>,
    /// Item-level sales tax rate, 0-100. Falls back to the document default.
    #[serde(default)]
    pub tax_rate: Option<Decimal>,
    /// Per-item withholding override (invoice only), 0-100.
    #[serde(default)]
    pub wht_rate: Option<Decimal>,
    /// Whether withholding applies to this item (invoice only).
    #[serde(default)]
    pub subject_to_withholding: bool,
}

impl LineItem {
    /// Bare item with the given quantity/price/cost and no rates.
    pub fn new(quantity: Decimal, unit_price: Decimal, unit_cost: Decimal) -> Self {
        Self {
            description: None,
            quantity,
            unit_price,
            unit_cost,
            discount_percent: None,
            tax_rate: None,
            wht_rate: None,
            subject_to_withholding: false,
        }
    }
}

impl ValueObject for LineItem {}

/// Derived per-item figures, stored alongside the item so downstream
/// consumers (PDF rendering, reporting) never recompute.
///
/// Dropped items (quantity <= 0) get an all-zero breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineBreakdown {
    /// `quantity x unit_price`.
    pub amount: Decimal,
    /// Item-level discount on `amount`.
    pub discount_amount: Decimal,
    /// Item-level sales tax on `amount`.
    pub tax_amount: Decimal,
    pub total_with_tax: Decimal,
    /// `amount` net of the item-level discount.
    pub revenue: Decimal,
    /// `quantity x unit_cost`.
    pub cost: Decimal,
    pub profit: Decimal,
    /// Percent of revenue, 0 when revenue is not positive.
    pub margin: Decimal,
    /// Percent of cost, 0 when cost is not positive.
    pub markup: Decimal,
    /// Withholding deducted for this item, 0 unless `subject_to_withholding`.
    pub withholding_amount: Decimal,
}

impl LineBreakdown {
    pub fn zero() -> Self {
        Self {
            amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_with_tax: Decimal::ZERO,
            revenue: Decimal::ZERO,
            cost: Decimal::ZERO,
            profit: Decimal::ZERO,
            margin: Decimal::ZERO,
            markup: Decimal::ZERO,
            withholding_amount: Decimal::ZERO,
        }
    }

    /// Round every monetary/percentage field, once, at finalization.
    pub(crate) fn rounded(self) -> Self {
        Self {
            amount: round2(self.amount),
            discount_amount: round2(self.discount_amount),
            tax_amount: round2(self.tax_amount),
            total_with_tax: round2(self.total_with_tax),
            revenue: round2(self.revenue),
            cost: round2(self.cost),
            profit: round2(self.profit),
            margin: round2(self.margin),
            markup: round2(self.markup),
            withholding_amount: round2(self.withholding_amount),
        }
    }
}

impl ValueObject for LineBreakdown {}
