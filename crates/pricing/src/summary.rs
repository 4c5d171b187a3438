//! The derived financial summary of a document.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billquill_core::{ValueObject, round2};

/// Complete financial summary of a document.
///
/// Derived, never edited directly: the calculator is the only producer.
/// `grand_total` and `net_receivable` are clamped at zero; profit and margin
/// figures may legitimately be negative (a loss-making document).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    /// Item-level sales tax, summed across items.
    pub tax_amount: Decimal,
    pub vat_amount: Decimal,
    pub withholding_tax_amount: Decimal,
    /// What the customer owes: discounted subtotal plus item tax and VAT.
    pub grand_total: Decimal,
    /// What the business actually collects: grand total minus withholding.
    pub net_receivable: Decimal,
    pub total_cost: Decimal,
    pub gross_profit: Decimal,
    pub net_profit: Decimal,
    /// Percent of gross revenue, 0 when revenue is not positive.
    pub gross_margin: Decimal,
    /// Percent of net revenue, 0 when revenue is not positive.
    pub net_margin: Decimal,
    /// Percent of total cost, 0 when cost is not positive.
    pub markup: Decimal,
}

impl FinancialSummary {
    pub fn zero() -> Self {
        Self {
            subtotal: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            vat_amount: Decimal::ZERO,
            withholding_tax_amount: Decimal::ZERO,
            grand_total: Decimal::ZERO,
            net_receivable: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            net_profit: Decimal::ZERO,
            gross_margin: Decimal::ZERO,
            net_margin: Decimal::ZERO,
            markup: Decimal::ZERO,
        }
    }

    /// Round every field, once, at finalization.
    pub(crate) fn rounded(self) -> Self {
        Self {
            subtotal: round2(self.subtotal),
            discount_amount: round2(self.discount_amount),
            tax_amount: round2(self.tax_amount),
            vat_amount: round2(self.vat_amount),
            withholding_tax_amount: round2(self.withholding_tax_amount),
            grand_total: round2(self.grand_total),
            net_receivable: round2(self.net_receivable),
            total_cost: round2(self.total_cost),
            gross_profit: round2(self.gross_profit),
            net_profit: round2(self.net_profit),
            gross_margin: round2(self.gross_margin),
            net_margin: round2(self.net_margin),
            markup: round2(self.markup),
        }
    }
}

impl ValueObject for FinancialSummary {}
