//! In-memory store and directory for tests/dev.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use billquill_core::{CustomerId, ExpectedVersion, TenantId};
use billquill_invoicing::Invoice;
use billquill_numbering::DocumentNumber;
use billquill_quotations::Quotation;

use crate::store::{Directory, InvoiceStore, QuotationStore, StoreError};

type Key = (TenantId, DocumentNumber);

fn poisoned() -> StoreError {
    StoreError::Backend("document store lock poisoned".into())
}

/// Document version accessor, so both maps share one set of store ops.
trait Stored: Clone {
    fn stored_tenant(&self) -> TenantId;
    fn stored_number(&self) -> &DocumentNumber;
    fn stored_version(&self) -> u64;
}

impl Stored for Quotation {
    fn stored_tenant(&self) -> TenantId {
        self.tenant_id()
    }

    fn stored_number(&self) -> &DocumentNumber {
        self.number()
    }

    fn stored_version(&self) -> u64 {
        self.version()
    }
}

impl Stored for Invoice {
    fn stored_tenant(&self) -> TenantId {
        self.tenant_id()
    }

    fn stored_number(&self) -> &DocumentNumber {
        self.number()
    }

    fn stored_version(&self) -> u64 {
        self.version()
    }
}

fn insert_doc<T: Stored>(map: &RwLock<HashMap<Key, T>>, doc: T) -> Result<(), StoreError> {
    let key = (doc.stored_tenant(), doc.stored_number().clone());
    let mut map = map.write().map_err(|_| poisoned())?;
    if map.contains_key(&key) {
        return Err(StoreError::Duplicate(key.1.to_string()));
    }
    map.insert(key, doc);
    Ok(())
}

fn find_doc<T: Stored>(
    map: &RwLock<HashMap<Key, T>>,
    tenant_id: TenantId,
    number: &DocumentNumber,
) -> Result<Option<T>, StoreError> {
    let map = map.read().map_err(|_| poisoned())?;
    Ok(map.get(&(tenant_id, number.clone())).cloned())
}

fn update_doc<T: Stored>(
    map: &RwLock<HashMap<Key, T>>,
    doc: T,
    expected: ExpectedVersion,
) -> Result<(), StoreError> {
    let key = (doc.stored_tenant(), doc.stored_number().clone());
    let mut map = map.write().map_err(|_| poisoned())?;
    let stored = map
        .get_mut(&key)
        .ok_or_else(|| StoreError::NotFound(key.1.to_string()))?;
    if !expected.matches(stored.stored_version()) {
        return Err(StoreError::Concurrency {
            number: key.1.to_string(),
            expected,
            actual: stored.stored_version(),
        });
    }
    *stored = doc;
    Ok(())
}

fn remove_doc<T: Stored>(
    map: &RwLock<HashMap<Key, T>>,
    tenant_id: TenantId,
    number: &DocumentNumber,
) -> Result<(), StoreError> {
    let mut map = map.write().map_err(|_| poisoned())?;
    map.remove(&(tenant_id, number.clone()))
        .map(|_| ())
        .ok_or_else(|| StoreError::NotFound(number.to_string()))
}

fn list_docs<T: Stored>(
    map: &RwLock<HashMap<Key, T>>,
    tenant_id: TenantId,
) -> Result<Vec<T>, StoreError> {
    let map = map.read().map_err(|_| poisoned())?;
    let mut docs: Vec<T> = map
        .values()
        .filter(|doc| doc.stored_tenant() == tenant_id)
        .cloned()
        .collect();
    docs.sort_by_key(|doc| doc.stored_number().sequence().unwrap_or(0));
    Ok(docs)
}

fn last_doc_number<T: Stored>(
    map: &RwLock<HashMap<Key, T>>,
    tenant_id: TenantId,
) -> Result<Option<DocumentNumber>, StoreError> {
    let map = map.read().map_err(|_| poisoned())?;
    Ok(map
        .values()
        .filter(|doc| doc.stored_tenant() == tenant_id)
        .max_by_key(|doc| doc.stored_number().sequence().unwrap_or(0))
        .map(|doc| doc.stored_number().clone()))
}

/// In-memory document store holding both document kinds.
///
/// - No IO / no async
/// - `RwLock<HashMap>` keyed by `(tenant, number)`
/// - Version-checked updates, like a real store would do with a
///   `WHERE version = ?` clause
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    quotations: RwLock<HashMap<Key, Quotation>>,
    invoices: RwLock<HashMap<Key, Invoice>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuotationStore for InMemoryDocumentStore {
    fn insert(&self, quotation: Quotation) -> Result<(), StoreError> {
        insert_doc(&self.quotations, quotation)
    }

    fn find(
        &self,
        tenant_id: TenantId,
        number: &DocumentNumber,
    ) -> Result<Option<Quotation>, StoreError> {
        find_doc(&self.quotations, tenant_id, number)
    }

    fn update(&self, quotation: Quotation, expected: ExpectedVersion) -> Result<(), StoreError> {
        update_doc(&self.quotations, quotation, expected)
    }

    fn remove(&self, tenant_id: TenantId, number: &DocumentNumber) -> Result<(), StoreError> {
        remove_doc(&self.quotations, tenant_id, number)
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<Quotation>, StoreError> {
        list_docs(&self.quotations, tenant_id)
    }

    fn last_number(&self, tenant_id: TenantId) -> Result<Option<DocumentNumber>, StoreError> {
        last_doc_number(&self.quotations, tenant_id)
    }
}

impl InvoiceStore for InMemoryDocumentStore {
    fn insert(&self, invoice: Invoice) -> Result<(), StoreError> {
        insert_doc(&self.invoices, invoice)
    }

    fn find(
        &self,
        tenant_id: TenantId,
        number: &DocumentNumber,
    ) -> Result<Option<Invoice>, StoreError> {
        find_doc(&self.invoices, tenant_id, number)
    }

    fn update(&self, invoice: Invoice, expected: ExpectedVersion) -> Result<(), StoreError> {
        update_doc(&self.invoices, invoice, expected)
    }

    fn remove(&self, tenant_id: TenantId, number: &DocumentNumber) -> Result<(), StoreError> {
        remove_doc(&self.invoices, tenant_id, number)
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<Invoice>, StoreError> {
        list_docs(&self.invoices, tenant_id)
    }

    fn last_number(&self, tenant_id: TenantId) -> Result<Option<DocumentNumber>, StoreError> {
        last_doc_number(&self.invoices, tenant_id)
    }
}

/// In-memory tenant/customer registry.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    tenants: RwLock<HashSet<TenantId>>,
    customers: RwLock<HashSet<(TenantId, CustomerId)>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tenant(&self, tenant_id: TenantId) -> Result<(), StoreError> {
        let mut tenants = self.tenants.write().map_err(|_| poisoned())?;
        tenants.insert(tenant_id);
        Ok(())
    }

    pub fn register_customer(
        &self,
        tenant_id: TenantId,
        customer_id: CustomerId,
    ) -> Result<(), StoreError> {
        let mut customers = self.customers.write().map_err(|_| poisoned())?;
        customers.insert((tenant_id, customer_id));
        Ok(())
    }
}

impl Directory for InMemoryDirectory {
    fn tenant_exists(&self, tenant_id: TenantId) -> Result<bool, StoreError> {
        let tenants = self.tenants.read().map_err(|_| poisoned())?;
        Ok(tenants.contains(&tenant_id))
    }

    fn customer_exists(
        &self,
        tenant_id: TenantId,
        customer_id: CustomerId,
    ) -> Result<bool, StoreError> {
        let customers = self.customers.read().map_err(|_| poisoned())?;
        Ok(customers.contains(&(tenant_id, customer_id)))
    }
}
