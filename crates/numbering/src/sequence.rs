//! Sequential number allocation.
//!
//! The seam is [`SequenceProvider`]; production deployments back it with a
//! database increment-and-return, tests and dev use [`InMemorySequences`].
//! Either way `next` must be atomic: observe-then-increment in application
//! code is exactly the race this module exists to remove.

use std::collections::HashMap;
use std::sync::Mutex;

use billquill_core::{DomainError, DomainResult, TenantId};

use crate::number::{DocumentKind, DocumentNumber};

/// Allocates the next sequential number for a tenant and document kind.
pub trait SequenceProvider: Send + Sync {
    /// Atomically claim the next number. Two concurrent calls for the same
    /// `(tenant, kind)` must never return the same value.
    fn next(&self, tenant_id: TenantId, kind: DocumentKind) -> DomainResult<DocumentNumber>;

    /// Initialize a counter from the most recently persisted number, so a
    /// restarted process continues the sequence instead of reissuing it.
    /// Never moves a counter backwards.
    fn seed(&self, tenant_id: TenantId, kind: DocumentKind, last: &DocumentNumber) -> DomainResult<()>;
}

impl<P> SequenceProvider for std::sync::Arc<P>
where
    P: SequenceProvider + ?Sized,
{
    fn next(&self, tenant_id: TenantId, kind: DocumentKind) -> DomainResult<DocumentNumber> {
        (**self).next(tenant_id, kind)
    }

    fn seed(&self, tenant_id: TenantId, kind: DocumentKind, last: &DocumentNumber) -> DomainResult<()> {
        (**self).seed(tenant_id, kind, last)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct SequenceKey {
    tenant_id: TenantId,
    kind: DocumentKind,
}

/// In-memory counter map.
///
/// An unseeded counter starts at zero, so the first allocation is `PREFIX-001`
/// (or the kind's padded equivalent).
#[derive(Debug, Default)]
pub struct InMemorySequences {
    counters: Mutex<HashMap<SequenceKey, u64>>,
}

impl InMemorySequences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SequenceProvider for InMemorySequences {
    fn next(&self, tenant_id: TenantId, kind: DocumentKind) -> DomainResult<DocumentNumber> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| DomainError::conflict("sequence counter lock poisoned"))?;

        let counter = counters.entry(SequenceKey { tenant_id, kind }).or_insert(0);
        *counter += 1;
        Ok(DocumentNumber::new(kind, *counter))
    }

    fn seed(&self, tenant_id: TenantId, kind: DocumentKind, last: &DocumentNumber) -> DomainResult<()> {
        let sequence = last.sequence().ok_or_else(|| {
            DomainError::invalid_id(format!("cannot seed from '{last}': no numeric suffix"))
        })?;

        let mut counters = self
            .counters
            .lock()
            .map_err(|_| DomainError::conflict("sequence counter lock poisoned"))?;

        let counter = counters.entry(SequenceKey { tenant_id, kind }).or_insert(0);
        *counter = (*counter).max(sequence);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    #[test]
    fn first_allocation_is_number_one() {
        let sequences = InMemorySequences::new();
        let tenant_id = test_tenant_id();

        let n = sequences.next(tenant_id, DocumentKind::Quotation).unwrap();
        assert_eq!(n.as_str(), "QT-001");
        let n = sequences.next(tenant_id, DocumentKind::Quotation).unwrap();
        assert_eq!(n.as_str(), "QT-002");
    }

    #[test]
    fn kinds_and_tenants_count_independently() {
        let sequences = InMemorySequences::new();
        let tenant_a = test_tenant_id();
        let tenant_b = test_tenant_id();

        sequences.next(tenant_a, DocumentKind::Quotation).unwrap();
        sequences.next(tenant_a, DocumentKind::Quotation).unwrap();

        let inv = sequences.next(tenant_a, DocumentKind::Invoice).unwrap();
        assert_eq!(inv.as_str(), "INV-00001");

        let other = sequences.next(tenant_b, DocumentKind::Quotation).unwrap();
        assert_eq!(other.as_str(), "QT-001");
    }

    #[test]
    fn seeding_resumes_after_the_last_persisted_number() {
        let sequences = InMemorySequences::new();
        let tenant_id = test_tenant_id();

        let last: DocumentNumber = "INV-00041".parse().unwrap();
        sequences.seed(tenant_id, DocumentKind::Invoice, &last).unwrap();

        let n = sequences.next(tenant_id, DocumentKind::Invoice).unwrap();
        assert_eq!(n.as_str(), "INV-00042");
    }

    #[test]
    fn seeding_never_moves_a_counter_backwards() {
        let sequences = InMemorySequences::new();
        let tenant_id = test_tenant_id();

        for _ in 0..5 {
            sequences.next(tenant_id, DocumentKind::Quotation).unwrap();
        }
        let stale: DocumentNumber = "QT-002".parse().unwrap();
        sequences.seed(tenant_id, DocumentKind::Quotation, &stale).unwrap();

        let n = sequences.next(tenant_id, DocumentKind::Quotation).unwrap();
        assert_eq!(n.as_str(), "QT-006");
    }

    #[test]
    fn concurrent_allocations_never_duplicate() {
        let sequences = Arc::new(InMemorySequences::new());
        let tenant_id = test_tenant_id();

        let threads = 8;
        let per_thread = 25;
        let mut handles = Vec::new();
        for _ in 0..threads {
            let sequences = Arc::clone(&sequences);
            handles.push(std::thread::spawn(move || {
                (0..per_thread)
                    .map(|_| {
                        sequences
                            .next(tenant_id, DocumentKind::Invoice)
                            .unwrap()
                            .sequence()
                            .unwrap()
                    })
                    .collect::<Vec<u64>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for sequence in handle.join().unwrap() {
                assert!(seen.insert(sequence), "duplicate sequence {sequence}");
            }
        }
        assert_eq!(seen.len(), threads * per_thread);
        assert_eq!(seen.iter().max(), Some(&(threads as u64 * per_thread as u64)));
    }
}
