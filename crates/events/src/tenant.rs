use billquill_core::TenantId;

use crate::EventEnvelope;

/// Helper trait for tenant-scoped messages.
///
/// Marks types carrying an associated tenant ID, so subscribers can filter or
/// validate the messages they consume (e.g. a per-tenant activity log worker
/// rejecting envelopes from other tenants).
pub trait TenantScoped {
    fn tenant_id(&self) -> TenantId;
}

impl<E> TenantScoped for EventEnvelope<E> {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id()
    }
}
