//! `billquill-quotations` — the quotation document and its lifecycle rules.

pub mod quotation;

pub use quotation::{Quotation, QuotationStatus};
