//! `billquill-invoicing` — the invoice document, payments, and lifecycle rules.

pub mod invoice;

pub use invoice::{Invoice, InvoiceStatus, Payment, PaymentMethod};
