//! `billquill-engine` — application services for the document lifecycle.
//!
//! Wires the pure pieces together: pricing, numbering, the quotation and
//! invoice domain types, persistence seams, and hook events. Everything here
//! is synchronous and storage-agnostic; the in-memory store backs tests and
//! dev, a database-backed store slots in behind the same traits.

pub mod conversion;
pub mod error;
pub mod hooks;
pub mod invoice_service;
pub mod quotation_service;
pub mod store;

pub use conversion::ConversionCoordinator;
pub use error::{EngineError, EngineResult};
pub use hooks::{DocumentEvent, HookEnvelope};
pub use invoice_service::{InvoicePatch, InvoiceService, NewInvoice};
pub use quotation_service::{NewQuotation, QuotationPatch, QuotationService};
pub use store::{
    Directory, InMemoryDirectory, InMemoryDocumentStore, InvoiceStore, QuotationStore, StoreError,
};
