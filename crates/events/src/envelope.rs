use serde::{Deserialize, Serialize};
use uuid::Uuid;

use billquill_core::TenantId;
use billquill_numbering::{DocumentKind, DocumentNumber};

/// Envelope for a hook event, carrying multi-tenant + document metadata.
///
/// This is the unit handed to subscribers. Multi-tenancy is enforced here via
/// `tenant_id`; the document is identified by its kind and human-readable
/// number, the same identifier callers and stores use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    tenant_id: TenantId,

    document_kind: DocumentKind,
    document_number: DocumentNumber,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        tenant_id: TenantId,
        document_kind: DocumentKind,
        document_number: DocumentNumber,
        payload: E,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            tenant_id,
            document_kind,
            document_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn document_kind(&self) -> DocumentKind {
        self.document_kind
    }

    pub fn document_number(&self) -> &DocumentNumber {
        &self.document_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
