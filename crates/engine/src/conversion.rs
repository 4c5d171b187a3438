//! One-way quotation-to-invoice conversion.
//!
//! Conversion is a two-document write with no surrounding transaction, so it
//! runs as a small saga: insert the invoice first, then flip the quotation,
//! and remove the invoice again if the flip cannot be persisted. The
//! financial figures are copied verbatim from the quotation; the agreed
//! numbers must not shift underneath the customer at conversion time.

use chrono::{Duration, Utc};
use tracing::{error, info};

use billquill_core::{DomainError, ExpectedVersion, TenantId, UserId};
use billquill_events::EventBus;
use billquill_invoicing::Invoice;
use billquill_numbering::{DocumentKind, DocumentNumber, SequenceProvider};
use billquill_pricing::PricingOutcome;

use crate::error::{EngineError, EngineResult};
use crate::hooks::{DocumentEvent, HookEnvelope, emit};
use crate::store::{InvoiceStore, QuotationStore};

/// Days until a converted invoice falls due.
const DEFAULT_PAYMENT_TERM_DAYS: i64 = 30;

/// Converts a quotation into an invoice.
pub struct ConversionCoordinator<Q, S, N, B>
where
    Q: QuotationStore,
    S: InvoiceStore,
    N: SequenceProvider,
    B: EventBus<HookEnvelope>,
{
    quotations: Q,
    invoices: S,
    sequences: N,
    hooks: B,
}

impl<Q, S, N, B> ConversionCoordinator<Q, S, N, B>
where
    Q: QuotationStore,
    S: InvoiceStore,
    N: SequenceProvider,
    B: EventBus<HookEnvelope>,
{
    pub fn new(quotations: Q, invoices: S, sequences: N, hooks: B) -> Self {
        Self {
            quotations,
            invoices,
            sequences,
            hooks,
        }
    }

    /// Convert a `Sent` or `Accepted`, not-yet-converted quotation.
    ///
    /// The new invoice carries the quotation's items, rates, summary and
    /// per-line breakdowns unchanged, a back-reference to the quotation, and
    /// a due date thirty days out. The quotation ends up `Accepted` with its
    /// one-way flag set.
    pub fn convert_to_invoice(
        &self,
        tenant_id: TenantId,
        quotation_number: &DocumentNumber,
        converted_by: UserId,
    ) -> EngineResult<Invoice> {
        let mut quotation = self
            .quotations
            .find(tenant_id, quotation_number)?
            .ok_or(DomainError::NotFound)?;
        quotation.ensure_convertible()?;
        let expected = ExpectedVersion::Exact(quotation.version());

        let now = Utc::now();
        let number = self.sequences.next(tenant_id, DocumentKind::Invoice)?;

        // Copied, not recomputed.
        let pricing = PricingOutcome {
            summary: quotation.summary().clone(),
            lines: quotation.line_breakdowns().to_vec(),
            warnings: Vec::new(),
        };
        let invoice = Invoice::new(
            number,
            tenant_id,
            quotation.customer_id(),
            Some(quotation.number().clone()),
            quotation.items().to_vec(),
            quotation.rates().clone(),
            pricing,
            now + Duration::days(DEFAULT_PAYMENT_TERM_DAYS),
            converted_by,
            now,
        );

        self.invoices.insert(invoice.clone())?;

        let flip = quotation
            .mark_converted(now)
            .map_err(EngineError::from)
            .and_then(|()| {
                self.quotations
                    .update(quotation.clone(), expected)
                    .map_err(EngineError::from)
            });
        if let Err(flip_error) = flip {
            // Compensate: the invoice must not survive a failed flip.
            if let Err(undo_error) = self.invoices.remove(tenant_id, invoice.number()) {
                error!(
                    ?undo_error,
                    number = %invoice.number(),
                    "failed to remove invoice after quotation flip failure"
                );
            }
            return Err(flip_error);
        }

        info!(
            tenant = %tenant_id,
            quotation = %quotation.number(),
            invoice = %invoice.number(),
            "quotation converted to invoice"
        );
        emit(
            &self.hooks,
            HookEnvelope::new(
                tenant_id,
                DocumentKind::Quotation,
                quotation.number().clone(),
                DocumentEvent::QuotationConverted {
                    invoice_number: invoice.number().clone(),
                    occurred_at: now,
                },
            ),
        );
        emit(
            &self.hooks,
            HookEnvelope::new(
                tenant_id,
                DocumentKind::Invoice,
                invoice.number().clone(),
                DocumentEvent::InvoiceCreated {
                    quotation_number: Some(quotation.number().clone()),
                    occurred_at: now,
                },
            ),
        );
        Ok(invoice)
    }
}
