//! Lifecycle hook events.
//!
//! Every successful service operation publishes one of these on the bus so
//! consumers (activity log, notifications) can react. Publishing is
//! best-effort: the document change is already committed when the hook fires,
//! and a failed publish is logged, never propagated.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use billquill_events::{Event, EventBus, EventEnvelope};
use billquill_invoicing::InvoiceStatus;
use billquill_numbering::DocumentNumber;
use billquill_quotations::QuotationStatus;

/// Envelope type the lifecycle services publish.
pub type HookEnvelope = EventEnvelope<DocumentEvent>;

/// Something that happened to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentEvent {
    QuotationCreated {
        occurred_at: DateTime<Utc>,
    },
    QuotationUpdated {
        occurred_at: DateTime<Utc>,
    },
    QuotationStatusChanged {
        from: QuotationStatus,
        to: QuotationStatus,
        occurred_at: DateTime<Utc>,
    },
    QuotationDeleted {
        occurred_at: DateTime<Utc>,
    },
    /// The quotation now has an invoice raised against it.
    QuotationConverted {
        invoice_number: DocumentNumber,
        occurred_at: DateTime<Utc>,
    },
    InvoiceCreated {
        quotation_number: Option<DocumentNumber>,
        occurred_at: DateTime<Utc>,
    },
    InvoiceUpdated {
        occurred_at: DateTime<Utc>,
    },
    InvoiceStatusChanged {
        from: InvoiceStatus,
        to: InvoiceStatus,
        occurred_at: DateTime<Utc>,
    },
    PaymentRecorded {
        amount: Decimal,
        balance_due: Decimal,
        occurred_at: DateTime<Utc>,
    },
    InvoiceDeleted {
        occurred_at: DateTime<Utc>,
    },
}

impl Event for DocumentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DocumentEvent::QuotationCreated { .. } => "billing.quotation.created",
            DocumentEvent::QuotationUpdated { .. } => "billing.quotation.updated",
            DocumentEvent::QuotationStatusChanged { .. } => "billing.quotation.status_changed",
            DocumentEvent::QuotationDeleted { .. } => "billing.quotation.deleted",
            DocumentEvent::QuotationConverted { .. } => "billing.quotation.converted",
            DocumentEvent::InvoiceCreated { .. } => "billing.invoice.created",
            DocumentEvent::InvoiceUpdated { .. } => "billing.invoice.updated",
            DocumentEvent::InvoiceStatusChanged { .. } => "billing.invoice.status_changed",
            DocumentEvent::PaymentRecorded { .. } => "billing.invoice.payment_recorded",
            DocumentEvent::InvoiceDeleted { .. } => "billing.invoice.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DocumentEvent::QuotationCreated { occurred_at }
            | DocumentEvent::QuotationUpdated { occurred_at }
            | DocumentEvent::QuotationStatusChanged { occurred_at, .. }
            | DocumentEvent::QuotationDeleted { occurred_at }
            | DocumentEvent::QuotationConverted { occurred_at, .. }
            | DocumentEvent::InvoiceCreated { occurred_at, .. }
            | DocumentEvent::InvoiceUpdated { occurred_at }
            | DocumentEvent::InvoiceStatusChanged { occurred_at, .. }
            | DocumentEvent::PaymentRecorded { occurred_at, .. }
            | DocumentEvent::InvoiceDeleted { occurred_at } => *occurred_at,
        }
    }
}

/// Publish a hook, logging (not propagating) failures.
pub(crate) fn emit<B>(hooks: &B, envelope: HookEnvelope)
where
    B: EventBus<HookEnvelope>,
{
    if let Err(error) = hooks.publish(envelope) {
        warn!(?error, "hook publish failed; the document change is already committed");
    }
}
