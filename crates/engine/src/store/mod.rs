//! Document persistence seams.
//!
//! The services talk to [`QuotationStore`] / [`InvoiceStore`] / [`Directory`]
//! traits; production deployments back them with a database, tests and dev use
//! the in-memory implementations. Updates carry an [`ExpectedVersion`] so two
//! writers racing on the same document lose deterministically instead of
//! silently overwriting each other.

mod in_memory;

pub use in_memory::{InMemoryDirectory, InMemoryDocumentStore};

use std::sync::Arc;

use thiserror::Error;

use billquill_core::{CustomerId, ExpectedVersion, TenantId};
use billquill_invoicing::Invoice;
use billquill_numbering::DocumentNumber;
use billquill_quotations::Quotation;

/// Failure inside a document store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Insert hit an existing document number (per tenant).
    #[error("document '{0}' already exists")]
    Duplicate(String),

    /// Update/remove targeted a document that is not there.
    #[error("document '{0}' not found")]
    NotFound(String),

    /// Optimistic concurrency check failed; reload and retry.
    #[error("version conflict on '{number}': expected {expected:?}, stored {actual}")]
    Concurrency {
        number: String,
        expected: ExpectedVersion,
        actual: u64,
    },

    /// The backing storage itself failed (poisoned lock, IO, ...).
    #[error("storage failure: {0}")]
    Backend(String),
}

/// Persistence for quotations, keyed by `(tenant, number)`.
pub trait QuotationStore: Send + Sync {
    fn insert(&self, quotation: Quotation) -> Result<(), StoreError>;

    fn find(
        &self,
        tenant_id: TenantId,
        number: &DocumentNumber,
    ) -> Result<Option<Quotation>, StoreError>;

    /// Replace the stored document, provided its version still matches
    /// `expected` (the version the caller loaded).
    fn update(&self, quotation: Quotation, expected: ExpectedVersion) -> Result<(), StoreError>;

    fn remove(&self, tenant_id: TenantId, number: &DocumentNumber) -> Result<(), StoreError>;

    fn list(&self, tenant_id: TenantId) -> Result<Vec<Quotation>, StoreError>;

    /// Highest-sequence number stored for the tenant, for seeding counters
    /// after a restart.
    fn last_number(&self, tenant_id: TenantId) -> Result<Option<DocumentNumber>, StoreError>;
}

/// Persistence for invoices, keyed by `(tenant, number)`.
pub trait InvoiceStore: Send + Sync {
    fn insert(&self, invoice: Invoice) -> Result<(), StoreError>;

    fn find(
        &self,
        tenant_id: TenantId,
        number: &DocumentNumber,
    ) -> Result<Option<Invoice>, StoreError>;

    fn update(&self, invoice: Invoice, expected: ExpectedVersion) -> Result<(), StoreError>;

    fn remove(&self, tenant_id: TenantId, number: &DocumentNumber) -> Result<(), StoreError>;

    fn list(&self, tenant_id: TenantId) -> Result<Vec<Invoice>, StoreError>;

    fn last_number(&self, tenant_id: TenantId) -> Result<Option<DocumentNumber>, StoreError>;
}

/// Existence checks for the accounts documents reference.
///
/// Tenants and customers live outside this engine; the services only need to
/// know whether a referenced account is real before creating a document.
pub trait Directory: Send + Sync {
    fn tenant_exists(&self, tenant_id: TenantId) -> Result<bool, StoreError>;

    fn customer_exists(
        &self,
        tenant_id: TenantId,
        customer_id: CustomerId,
    ) -> Result<bool, StoreError>;
}

impl<S> QuotationStore for Arc<S>
where
    S: QuotationStore + ?Sized,
{
    fn insert(&self, quotation: Quotation) -> Result<(), StoreError> {
        (**self).insert(quotation)
    }

    fn find(
        &self,
        tenant_id: TenantId,
        number: &DocumentNumber,
    ) -> Result<Option<Quotation>, StoreError> {
        (**self).find(tenant_id, number)
    }

    fn update(&self, quotation: Quotation, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).update(quotation, expected)
    }

    fn remove(&self, tenant_id: TenantId, number: &DocumentNumber) -> Result<(), StoreError> {
        (**self).remove(tenant_id, number)
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<Quotation>, StoreError> {
        (**self).list(tenant_id)
    }

    fn last_number(&self, tenant_id: TenantId) -> Result<Option<DocumentNumber>, StoreError> {
        (**self).last_number(tenant_id)
    }
}

impl<S> InvoiceStore for Arc<S>
where
    S: InvoiceStore + ?Sized,
{
    fn insert(&self, invoice: Invoice) -> Result<(), StoreError> {
        (**self).insert(invoice)
    }

    fn find(
        &self,
        tenant_id: TenantId,
        number: &DocumentNumber,
    ) -> Result<Option<Invoice>, StoreError> {
        (**self).find(tenant_id, number)
    }

    fn update(&self, invoice: Invoice, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).update(invoice, expected)
    }

    fn remove(&self, tenant_id: TenantId, number: &DocumentNumber) -> Result<(), StoreError> {
        (**self).remove(tenant_id, number)
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<Invoice>, StoreError> {
        (**self).list(tenant_id)
    }

    fn last_number(&self, tenant_id: TenantId) -> Result<Option<DocumentNumber>, StoreError> {
        (**self).last_number(tenant_id)
    }
}

impl<D> Directory for Arc<D>
where
    D: Directory + ?Sized,
{
    fn tenant_exists(&self, tenant_id: TenantId) -> Result<bool, StoreError> {
        (**self).tenant_exists(tenant_id)
    }

    fn customer_exists(
        &self,
        tenant_id: TenantId,
        customer_id: CustomerId,
    ) -> Result<bool, StoreError> {
        (**self).customer_exists(tenant_id, customer_id)
    }
}
