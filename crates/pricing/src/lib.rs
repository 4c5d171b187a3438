//! `billquill-pricing` — deterministic financial computation.
//!
//! Pure functions only: given line items and document-level rates, produce a
//! complete [`FinancialSummary`] plus per-item [`LineBreakdown`]s. Bad input
//! never fails a calculation; it is sanitized, reported as structured
//! [`PricingWarning`]s, and logged.

pub mod calculator;
pub mod item;
pub mod rates;
pub mod summary;

pub use calculator::{PricingOutcome, PricingWarning, compute_financials};
pub use item::{LineBreakdown, LineItem};
pub use rates::{DiscountKind, DocumentRate, DocumentRates, ItemRate};
pub use summary::FinancialSummary;
