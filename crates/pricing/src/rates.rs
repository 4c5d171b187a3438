//! Document-level rates: discount, default sales tax, VAT, withholding.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billquill_core::ValueObject;

/// How the document-level discount is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// Percentage of the subtotal (0-100 and beyond; may exceed the subtotal).
    Percentage,
    /// Flat monetary amount.
    Flat,
}

/// Rates applied at document granularity.
///
/// `default_tax_rate` fills in for items that carry no item-level sales tax
/// rate. VAT and withholding always apply at document level, on the
/// discounted subtotal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRates {
    pub discount: Decimal,
    pub discount_kind: DiscountKind,
    pub default_tax_rate: Option<Decimal>,
    pub vat_rate: Decimal,
    pub wht_rate: Decimal,
}

impl Default for DocumentRates {
    fn default() -> Self {
        Self {
            discount: Decimal::ZERO,
            discount_kind: DiscountKind::Flat,
            default_tax_rate: None,
            vat_rate: Decimal::ZERO,
            wht_rate: Decimal::ZERO,
        }
    }
}

impl ValueObject for DocumentRates {}

/// Which document-level rate a sanitization warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRate {
    DefaultTax,
    Vat,
    Withholding,
    Discount,
}

/// Which item-level rate a sanitization warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRate {
    Tax,
    Discount,
    Withholding,
}

/// A percentage rate is usable only within `[0, 100]`.
pub(crate) fn rate_in_range(rate: Decimal) -> bool {
    rate >= Decimal::ZERO && rate <= Decimal::ONE_HUNDRED
}
