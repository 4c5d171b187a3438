//! The financial calculator.
//!
//! `compute_financials` is the single producer of document summaries. It is
//! pure and total: malformed numeric input is sanitized and reported, never
//! rejected, so invoicing is never blocked on dirty data. Only the final
//! output fields are rounded; intermediate arithmetic is exact decimal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use billquill_core::money::clamp_non_negative;

use crate::item::{LineBreakdown, LineItem};
use crate::rates::{DiscountKind, DocumentRate, DocumentRates, ItemRate, rate_in_range};
use crate::summary::FinancialSummary;

/// Structured sanitization diagnostics.
///
/// Every silently-degraded input produces one of these alongside a `warn!`
/// log, so callers can surface or assert on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingWarning {
    /// Item excluded from computation (`quantity <= 0`).
    ItemDropped { index: usize },
    /// Negative unit price treated as zero.
    UnitPriceClamped { index: usize },
    /// Negative unit cost treated as zero.
    UnitCostClamped { index: usize },
    /// Document-level rate outside `[0, 100]` (or a negative discount) reset to zero.
    DocumentRateReset { rate: DocumentRate },
    /// Item-level rate outside `[0, 100]` reset to zero.
    ItemRateReset { index: usize, rate: ItemRate },
}

/// Everything the calculator produces for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingOutcome {
    pub summary: FinancialSummary,
    /// One breakdown per input item, in input order. Dropped items get zeros.
    pub lines: Vec<LineBreakdown>,
    pub warnings: Vec<PricingWarning>,
}

impl PricingOutcome {
    /// True when no input was sanitized.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Compute the complete financial summary for a list of line items.
///
/// Step order follows the documented algorithm exactly; reordering changes
/// rounding-visible results. Degrades to an all-zero summary when every item
/// is dropped.
pub fn compute_financials(items: &[LineItem], rates: &DocumentRates) -> PricingOutcome {
    let mut warnings = Vec::new();

    let discount = sanitize_discount(rates.discount, &mut warnings);
    let default_tax_rate = rates
        .default_tax_rate
        .map(|r| sanitize_rate(r, DocumentRate::DefaultTax, &mut warnings))
        .unwrap_or(Decimal::ZERO);
    let vat_rate = sanitize_rate(rates.vat_rate, DocumentRate::Vat, &mut warnings);
    let wht_rate = sanitize_rate(rates.wht_rate, DocumentRate::Withholding, &mut warnings);

    let mut lines = Vec::with_capacity(items.len());
    let mut subtotal = Decimal::ZERO;
    let mut tax_amount = Decimal::ZERO;
    let mut total_cost = Decimal::ZERO;
    let mut any_kept = false;

    for (index, item) in items.iter().enumerate() {
        if item.quantity <= Decimal::ZERO {
            warn!(index, quantity = %item.quantity, "dropping line item with non-positive quantity");
            warnings.push(PricingWarning::ItemDropped { index });
            lines.push(LineBreakdown::zero());
            continue;
        }

        let unit_price = if item.unit_price < Decimal::ZERO {
            warn!(index, unit_price = %item.unit_price, "clamping negative unit price to zero");
            warnings.push(PricingWarning::UnitPriceClamped { index });
            Decimal::ZERO
        } else {
            item.unit_price
        };
        let unit_cost = if item.unit_cost < Decimal::ZERO {
            warn!(index, unit_cost = %item.unit_cost, "clamping negative unit cost to zero");
            warnings.push(PricingWarning::UnitCostClamped { index });
            Decimal::ZERO
        } else {
            item.unit_cost
        };

        let breakdown = breakdown_for(
            index,
            item,
            unit_price,
            unit_cost,
            default_tax_rate,
            wht_rate,
            &mut warnings,
        );

        subtotal += breakdown.amount;
        tax_amount += breakdown.tax_amount;
        total_cost += breakdown.cost;
        any_kept = true;
        lines.push(breakdown);
    }

    let lines: Vec<LineBreakdown> = lines.into_iter().map(LineBreakdown::rounded).collect();

    if !any_kept {
        return PricingOutcome {
            summary: FinancialSummary::zero(),
            lines,
            warnings,
        };
    }

    let discount_amount = match rates.discount_kind {
        DiscountKind::Percentage => subtotal * discount / Decimal::ONE_HUNDRED,
        DiscountKind::Flat => discount,
    };

    // Discounted base for VAT/WHT can go negative when the discount exceeds
    // the subtotal, and so can the two tax amounts; only `grand_total` and
    // `net_receivable` clamp at zero.
    let discounted = subtotal - discount_amount;
    let vat_amount = discounted * vat_rate / Decimal::ONE_HUNDRED;
    let withholding_tax_amount = discounted * wht_rate / Decimal::ONE_HUNDRED;

    let grand_total = clamp_non_negative(subtotal + tax_amount + vat_amount - discount_amount);
    let net_receivable = clamp_non_negative(grand_total - withholding_tax_amount);

    let gross_revenue = subtotal - discount_amount;
    let gross_profit = gross_revenue - total_cost;
    let net_revenue = gross_revenue - withholding_tax_amount;
    let net_profit = net_revenue - total_cost;

    let summary = FinancialSummary {
        subtotal,
        discount_amount,
        tax_amount,
        vat_amount,
        withholding_tax_amount,
        grand_total,
        net_receivable,
        total_cost,
        gross_profit,
        net_profit,
        gross_margin: percent_of(gross_profit, gross_revenue),
        net_margin: percent_of(net_profit, net_revenue),
        markup: percent_of(gross_profit, total_cost),
    }
    .rounded();

    PricingOutcome {
        summary,
        lines,
        warnings,
    }
}

/// `part / base * 100`, or zero when the base is not positive.
fn percent_of(part: Decimal, base: Decimal) -> Decimal {
    if base > Decimal::ZERO {
        part / base * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

fn sanitize_rate(rate: Decimal, which: DocumentRate, warnings: &mut Vec<PricingWarning>) -> Decimal {
    if rate_in_range(rate) {
        rate
    } else {
        warn!(rate = %rate, field = ?which, "document rate outside [0, 100], resetting to zero");
        warnings.push(PricingWarning::DocumentRateReset { rate: which });
        Decimal::ZERO
    }
}

/// The discount value itself is not a rate: a percentage above 100 is allowed
/// (it may exceed the subtotal), but a negative discount is reset.
fn sanitize_discount(discount: Decimal, warnings: &mut Vec<PricingWarning>) -> Decimal {
    if discount < Decimal::ZERO {
        warn!(discount = %discount, "negative discount, resetting to zero");
        warnings.push(PricingWarning::DocumentRateReset {
            rate: DocumentRate::Discount,
        });
        Decimal::ZERO
    } else {
        discount
    }
}

fn sanitize_item_rate(
    rate: Option<Decimal>,
    index: usize,
    which: ItemRate,
    warnings: &mut Vec<PricingWarning>,
) -> Option<Decimal> {
    match rate {
        Some(r) if rate_in_range(r) => Some(r),
        Some(r) => {
            warn!(index, rate = %r, field = ?which, "item rate outside [0, 100], resetting to zero");
            warnings.push(PricingWarning::ItemRateReset { index, rate: which });
            Some(Decimal::ZERO)
        }
        None => None,
    }
}

fn breakdown_for(
    index: usize,
    item: &LineItem,
    unit_price: Decimal,
    unit_cost: Decimal,
    default_tax_rate: Decimal,
    document_wht_rate: Decimal,
    warnings: &mut Vec<PricingWarning>,
) -> LineBreakdown {
    let tax_rate = sanitize_item_rate(item.tax_rate, index, ItemRate::Tax, warnings)
        .unwrap_or(default_tax_rate);
    let discount_percent =
        sanitize_item_rate(item.discount_percent, index, ItemRate::Discount, warnings)
            .unwrap_or(Decimal::ZERO);
    let wht_rate = sanitize_item_rate(item.wht_rate, index, ItemRate::Withholding, warnings)
        .unwrap_or(document_wht_rate);

    let amount = item.quantity * unit_price;
    let tax_amount = amount * tax_rate / Decimal::ONE_HUNDRED;
    let discount_amount = amount * discount_percent / Decimal::ONE_HUNDRED;
    let revenue = amount - discount_amount;
    let cost = item.quantity * unit_cost;
    let profit = revenue - cost;
    let withholding_amount = if item.subject_to_withholding {
        revenue * wht_rate / Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    LineBreakdown {
        amount,
        discount_amount,
        tax_amount,
        total_with_tax: amount + tax_amount,
        revenue,
        cost,
        profit,
        margin: percent_of(profit, revenue),
        markup: percent_of(profit, cost),
        withholding_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(quantity: Decimal, unit_price: Decimal) -> LineItem {
        LineItem::new(quantity, unit_price, Decimal::ZERO)
    }

    fn flat_rates(discount: Decimal, vat_rate: Decimal, wht_rate: Decimal) -> DocumentRates {
        DocumentRates {
            discount,
            discount_kind: DiscountKind::Flat,
            default_tax_rate: None,
            vat_rate,
            wht_rate,
        }
    }

    #[test]
    fn worked_example_matches_documented_figures() {
        // Two items, flat discount 10, VAT 10%, WHT 5%.
        let items = vec![item(dec!(2), dec!(100)), item(dec!(1), dec!(50))];
        let rates = flat_rates(dec!(10), dec!(10), dec!(5));

        let out = compute_financials(&items, &rates);
        let s = &out.summary;

        assert_eq!(s.subtotal, dec!(250));
        assert_eq!(s.discount_amount, dec!(10));
        assert_eq!(s.tax_amount, dec!(0));
        assert_eq!(s.vat_amount, dec!(24)); // (250 - 10) * 10%
        assert_eq!(s.grand_total, dec!(264)); // 250 + 0 + 24 - 10
        assert_eq!(s.withholding_tax_amount, dec!(12)); // 240 * 5%
        assert_eq!(s.net_receivable, dec!(252)); // 264 - 12
        assert!(out.is_clean());
    }

    #[test]
    fn percentage_discount_scales_with_subtotal() {
        let items = vec![item(dec!(4), dec!(25))]; // subtotal 100
        let rates = DocumentRates {
            discount: dec!(15),
            discount_kind: DiscountKind::Percentage,
            ..DocumentRates::default()
        };

        let s = compute_financials(&items, &rates).summary;
        assert_eq!(s.discount_amount, dec!(15));
        assert_eq!(s.grand_total, dec!(85));
    }

    #[test]
    fn empty_items_and_all_dropped_items_yield_the_same_zero_summary() {
        let rates = flat_rates(dec!(10), dec!(7), dec!(3));

        let empty = compute_financials(&[], &rates);
        let dropped = compute_financials(&[item(dec!(0), dec!(100))], &rates);

        assert_eq!(empty.summary, FinancialSummary::zero());
        assert_eq!(empty.summary, dropped.summary);
        assert_eq!(
            dropped.warnings,
            vec![PricingWarning::ItemDropped { index: 0 }]
        );
        assert_eq!(dropped.lines, vec![LineBreakdown::zero()]);
    }

    #[test]
    fn rates_outside_range_are_reset_not_rejected() {
        let items = vec![item(dec!(1), dec!(100))];
        let rates = flat_rates(dec!(0), dec!(150), dec!(-5));

        let out = compute_financials(&items, &rates);
        assert_eq!(out.summary.vat_amount, dec!(0));
        assert_eq!(out.summary.withholding_tax_amount, dec!(0));
        assert_eq!(out.summary.grand_total, dec!(100));
        assert!(out.warnings.contains(&PricingWarning::DocumentRateReset {
            rate: DocumentRate::Vat
        }));
        assert!(out.warnings.contains(&PricingWarning::DocumentRateReset {
            rate: DocumentRate::Withholding
        }));
    }

    #[test]
    fn negative_price_and_cost_are_clamped_to_zero() {
        let items = vec![LineItem::new(dec!(3), dec!(-10), dec!(-4))];
        let out = compute_financials(&items, &DocumentRates::default());

        assert_eq!(out.summary.subtotal, dec!(0));
        assert_eq!(out.summary.total_cost, dec!(0));
        assert_eq!(
            out.warnings,
            vec![
                PricingWarning::UnitPriceClamped { index: 0 },
                PricingWarning::UnitCostClamped { index: 0 },
            ]
        );
    }

    #[test]
    fn item_tax_rate_falls_back_to_document_default() {
        let mut taxed = item(dec!(1), dec!(100));
        taxed.tax_rate = Some(dec!(7));
        let untaxed = item(dec!(1), dec!(100));

        let rates = DocumentRates {
            default_tax_rate: Some(dec!(10)),
            ..DocumentRates::default()
        };
        let out = compute_financials(&[taxed, untaxed], &rates);

        assert_eq!(out.lines[0].tax_amount, dec!(7));
        assert_eq!(out.lines[1].tax_amount, dec!(10));
        assert_eq!(out.summary.tax_amount, dec!(17));
        assert_eq!(out.summary.grand_total, dec!(217));
    }

    #[test]
    fn flat_discount_exceeding_subtotal_clamps_only_the_final_totals() {
        let items = vec![item(dec!(1), dec!(50))];
        let rates = flat_rates(dec!(80), dec!(10), dec!(5));

        let s = compute_financials(&items, &rates).summary;
        assert_eq!(s.discount_amount, dec!(80)); // not clamped to the subtotal
        assert_eq!(s.vat_amount, dec!(-3)); // (50 - 80) * 10%, unclamped
        assert_eq!(s.withholding_tax_amount, dec!(-1.5));
        assert_eq!(s.grand_total, dec!(0)); // max(0, 50 - 3 - 80)
        assert_eq!(s.net_receivable, dec!(1.5)); // max(0, 0 - (-1.5))
        // Profit still reflects the loss.
        assert_eq!(s.gross_profit, dec!(-30));
    }

    #[test]
    fn vat_on_a_negative_base_offsets_item_tax_in_the_grand_total() {
        // Item tax keeps the pre-clamp total positive even though the
        // discount swallows the subtotal; the negative VAT must flow into
        // the sum unclamped.
        let mut taxed = item(dec!(1), dec!(100));
        taxed.tax_rate = Some(dec!(100));
        let rates = flat_rates(dec!(150), dec!(10), dec!(0));

        let s = compute_financials(&[taxed], &rates).summary;
        assert_eq!(s.tax_amount, dec!(100));
        assert_eq!(s.vat_amount, dec!(-5)); // (100 - 150) * 10%
        assert_eq!(s.grand_total, dec!(45)); // max(0, 100 + 100 - 5 - 150)
    }

    #[test]
    fn profit_and_margin_figures() {
        let items = vec![LineItem::new(dec!(1), dec!(100), dec!(60))];
        let s = compute_financials(&items, &DocumentRates::default()).summary;

        assert_eq!(s.total_cost, dec!(60));
        assert_eq!(s.gross_profit, dec!(40));
        assert_eq!(s.gross_margin, dec!(40));
        assert_eq!(s.markup, dec!(66.67)); // 40 / 60, rounded half-up
    }

    #[test]
    fn withholding_reduces_net_but_not_grand_total() {
        let items = vec![LineItem::new(dec!(1), dec!(1000), dec!(400))];
        let rates = flat_rates(dec!(0), dec!(0), dec!(3));

        let s = compute_financials(&items, &rates).summary;
        assert_eq!(s.grand_total, dec!(1000));
        assert_eq!(s.withholding_tax_amount, dec!(30));
        assert_eq!(s.net_receivable, dec!(970));
        assert_eq!(s.gross_profit, dec!(600));
        assert_eq!(s.net_profit, dec!(570));
        assert_eq!(s.net_margin, dec!(58.76)); // 570 / 970
    }

    #[test]
    fn item_discount_annotates_the_line_without_touching_document_totals() {
        let mut discounted = item(dec!(2), dec!(100));
        discounted.discount_percent = Some(dec!(25));

        let out = compute_financials(&[discounted], &DocumentRates::default());
        assert_eq!(out.lines[0].amount, dec!(200));
        assert_eq!(out.lines[0].discount_amount, dec!(50));
        assert_eq!(out.lines[0].revenue, dec!(150));
        // Document subtotal stays the exact quantity x price sum.
        assert_eq!(out.summary.subtotal, dec!(200));
        assert_eq!(out.summary.discount_amount, dec!(0));
    }

    #[test]
    fn per_item_withholding_uses_override_then_document_rate() {
        let mut with_override = item(dec!(1), dec!(100));
        with_override.subject_to_withholding = true;
        with_override.wht_rate = Some(dec!(2));

        let mut without_override = item(dec!(1), dec!(100));
        without_override.subject_to_withholding = true;

        let exempt = item(dec!(1), dec!(100));

        let rates = flat_rates(dec!(0), dec!(0), dec!(5));
        let out = compute_financials(&[with_override, without_override, exempt], &rates);

        assert_eq!(out.lines[0].withholding_amount, dec!(2));
        assert_eq!(out.lines[1].withholding_amount, dec!(5));
        assert_eq!(out.lines[2].withholding_amount, dec!(0));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn cents(v: i64) -> Decimal {
            Decimal::new(v, 2)
        }

        prop_compose! {
            fn arb_item()(
                quantity in 1i64..1_000,
                price_cents in 0i64..1_000_000,
                cost_cents in 0i64..1_000_000,
            ) -> LineItem {
                LineItem::new(Decimal::from(quantity), cents(price_cents), cents(cost_cents))
            }
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// The payable totals never go negative, whatever the discount
            /// or rates; intermediate tax amounts may.
            #[test]
            fn totals_are_never_negative(
                items in prop::collection::vec(arb_item(), 0..8),
                discount_cents in 0i64..200_000_000,
                vat in -50i64..200,
                wht in -50i64..200,
            ) {
                let rates = DocumentRates {
                    discount: cents(discount_cents),
                    discount_kind: DiscountKind::Flat,
                    default_tax_rate: None,
                    vat_rate: Decimal::from(vat),
                    wht_rate: Decimal::from(wht),
                };
                let s = compute_financials(&items, &rates).summary;
                prop_assert!(s.grand_total >= Decimal::ZERO);
                prop_assert!(s.net_receivable >= Decimal::ZERO);
            }

            /// For clean items the subtotal is the exact quantity x price sum.
            #[test]
            fn subtotal_is_exact_for_clean_items(
                items in prop::collection::vec(arb_item(), 1..8),
            ) {
                let expected: Decimal = items
                    .iter()
                    .map(|i| i.quantity * i.unit_price)
                    .sum();
                let out = compute_financials(&items, &DocumentRates::default());
                prop_assert!(out.is_clean());
                prop_assert_eq!(out.summary.subtotal, expected);
            }
        }
    }
}
