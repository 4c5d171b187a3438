//! Invoice lifecycle service.

use chrono::{DateTime, Utc};
use tracing::{error, info};

use billquill_core::{CustomerId, DomainError, ExpectedVersion, TenantId, UserId};
use billquill_events::EventBus;
use billquill_invoicing::{Invoice, InvoiceStatus, Payment};
use billquill_numbering::{DocumentKind, DocumentNumber, SequenceProvider};
use billquill_pricing::{DocumentRates, LineItem, PricingWarning, compute_financials};

use crate::error::{EngineError, EngineResult};
use crate::hooks::{DocumentEvent, HookEnvelope, emit};
use crate::store::{Directory, InvoiceStore, QuotationStore};

/// Input for creating an invoice.
///
/// `quotation_number` links the invoice back to a quotation; that quotation's
/// one-way flag is flipped as part of the create.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub customer_id: CustomerId,
    pub quotation_number: Option<DocumentNumber>,
    pub items: Vec<LineItem>,
    pub rates: DocumentRates,
    pub due_date: DateTime<Utc>,
}

/// Partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct InvoicePatch {
    pub items: Option<Vec<LineItem>>,
    pub rates: Option<DocumentRates>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Orchestrates invoice operations, including payments and the
/// create-with-quotation-link flow. Domain rules live on [`Invoice`].
pub struct InvoiceService<S, Q, D, N, B>
where
    S: InvoiceStore,
    Q: QuotationStore,
    D: Directory,
    N: SequenceProvider,
    B: EventBus<HookEnvelope>,
{
    invoices: S,
    quotations: Q,
    directory: D,
    sequences: N,
    hooks: B,
}

impl<S, Q, D, N, B> InvoiceService<S, Q, D, N, B>
where
    S: InvoiceStore,
    Q: QuotationStore,
    D: Directory,
    N: SequenceProvider,
    B: EventBus<HookEnvelope>,
{
    pub fn new(invoices: S, quotations: Q, directory: D, sequences: N, hooks: B) -> Self {
        Self {
            invoices,
            quotations,
            directory,
            sequences,
            hooks,
        }
    }

    /// Create an invoice as `Draft`.
    ///
    /// When a quotation is linked, the quotation must exist under the same
    /// tenant and must not already be converted; its flag is flipped in the
    /// same operation, with the inserted invoice removed again if the flip
    /// cannot be persisted.
    pub fn create(
        &self,
        tenant_id: TenantId,
        created_by: UserId,
        input: NewInvoice,
    ) -> EngineResult<(Invoice, Vec<PricingWarning>)> {
        self.check_references(tenant_id, input.customer_id)?;

        let linked = match &input.quotation_number {
            Some(number) => Some(
                self.quotations
                    .find(tenant_id, number)?
                    .ok_or(DomainError::NotFound)?,
            ),
            None => None,
        };
        if let Some(quotation) = &linked {
            if quotation.converted_to_invoice() {
                return Err(DomainError::conflict(
                    "quotation has already been converted to an invoice",
                )
                .into());
            }
        }

        let mut outcome = compute_financials(&input.items, &input.rates);
        let warnings = std::mem::take(&mut outcome.warnings);

        let number = self.sequences.next(tenant_id, DocumentKind::Invoice)?;
        let now = Utc::now();
        let invoice = Invoice::new(
            number,
            tenant_id,
            input.customer_id,
            input.quotation_number,
            input.items,
            input.rates,
            outcome,
            input.due_date,
            created_by,
            now,
        );

        self.invoices.insert(invoice.clone())?;

        if let Some(mut quotation) = linked {
            let expected = ExpectedVersion::Exact(quotation.version());
            let flip = quotation
                .mark_invoiced(now)
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
        }

        info!(tenant = %tenant_id, number = %invoice.number(), "invoice created");
        emit(
            &self.hooks,
            HookEnvelope::new(
                tenant_id,
                DocumentKind::Invoice,
                invoice.number().clone(),
                DocumentEvent::InvoiceCreated {
                    quotation_number: invoice.quotation_number().cloned(),
                    occurred_at: now,
                },
            ),
        );
        Ok((invoice, warnings))
    }

    pub fn get(&self, tenant_id: TenantId, number: &DocumentNumber) -> EngineResult<Invoice> {
        self.load(tenant_id, number)
    }

    pub fn list(&self, tenant_id: TenantId) -> EngineResult<Vec<Invoice>> {
        Ok(self.invoices.list(tenant_id)?)
    }

    /// Apply a patch and recompute financials if items or rates changed.
    /// The outstanding balance is rebased against the new grand total.
    pub fn update(
        &self,
        tenant_id: TenantId,
        number: &DocumentNumber,
        patch: InvoicePatch,
    ) -> EngineResult<(Invoice, Vec<PricingWarning>)> {
        let mut invoice = self.load(tenant_id, number)?;
        let expected = ExpectedVersion::Exact(invoice.version());

        let mut warnings = Vec::new();
        if patch.items.is_some() || patch.rates.is_some() {
            let items = patch.items.unwrap_or_else(|| invoice.items().to_vec());
            let rates = patch.rates.unwrap_or_else(|| invoice.rates().clone());
            let mut outcome = compute_financials(&items, &rates);
            warnings = std::mem::take(&mut outcome.warnings);
            invoice.reprice(items, rates, outcome)?;
        }
        if let Some(due_date) = patch.due_date {
            invoice.set_due_date(due_date)?;
        }

        self.invoices.update(invoice.clone(), expected)?;
        emit(
            &self.hooks,
            HookEnvelope::new(
                tenant_id,
                DocumentKind::Invoice,
                invoice.number().clone(),
                DocumentEvent::InvoiceUpdated {
                    occurred_at: Utc::now(),
                },
            ),
        );
        Ok((invoice, warnings))
    }

    /// Move the invoice through its status machine.
    pub fn update_status(
        &self,
        tenant_id: TenantId,
        number: &DocumentNumber,
        status: InvoiceStatus,
    ) -> EngineResult<Invoice> {
        let mut invoice = self.load(tenant_id, number)?;
        let expected = ExpectedVersion::Exact(invoice.version());
        let from = invoice.status();
        let now = Utc::now();

        invoice.transition(status, now)?;
        self.invoices.update(invoice.clone(), expected)?;
        info!(tenant = %tenant_id, number = %invoice.number(), ?from, to = ?status, "invoice status changed");
        emit(
            &self.hooks,
            HookEnvelope::new(
                tenant_id,
                DocumentKind::Invoice,
                invoice.number().clone(),
                DocumentEvent::InvoiceStatusChanged {
                    from,
                    to: status,
                    occurred_at: now,
                },
            ),
        );
        Ok(invoice)
    }

    /// Record a payment; the invoice moves to `PartiallyPaid` or `Paid`.
    pub fn record_payment(
        &self,
        tenant_id: TenantId,
        number: &DocumentNumber,
        payment: Payment,
    ) -> EngineResult<Invoice> {
        let mut invoice = self.load(tenant_id, number)?;
        let expected = ExpectedVersion::Exact(invoice.version());
        let now = Utc::now();
        let amount = payment.amount;

        invoice.record_payment(payment, now)?;
        self.invoices.update(invoice.clone(), expected)?;
        info!(
            tenant = %tenant_id,
            number = %invoice.number(),
            %amount,
            balance = %invoice.balance_due(),
            "payment recorded"
        );
        emit(
            &self.hooks,
            HookEnvelope::new(
                tenant_id,
                DocumentKind::Invoice,
                invoice.number().clone(),
                DocumentEvent::PaymentRecorded {
                    amount,
                    balance_due: invoice.balance_due(),
                    occurred_at: now,
                },
            ),
        );
        Ok(invoice)
    }

    /// Delete an invoice. Paid invoices refuse.
    pub fn remove(&self, tenant_id: TenantId, number: &DocumentNumber) -> EngineResult<()> {
        let invoice = self.load(tenant_id, number)?;
        invoice.ensure_removable()?;

        self.invoices.remove(tenant_id, number)?;
        emit(
            &self.hooks,
            HookEnvelope::new(
                tenant_id,
                DocumentKind::Invoice,
                number.clone(),
                DocumentEvent::InvoiceDeleted {
                    occurred_at: Utc::now(),
                },
            ),
        );
        Ok(())
    }

    /// Seed the number counter from the highest persisted number.
    pub fn restore_sequence(&self, tenant_id: TenantId) -> EngineResult<()> {
        if let Some(last) = self.invoices.last_number(tenant_id)? {
            self.sequences
                .seed(tenant_id, DocumentKind::Invoice, &last)?;
        }
        Ok(())
    }

    fn check_references(&self, tenant_id: TenantId, customer_id: CustomerId) -> EngineResult<()> {
        if !self.directory.tenant_exists(tenant_id)? {
            return Err(DomainError::validation("tenant account does not exist").into());
        }
        if !self.directory.customer_exists(tenant_id, customer_id)? {
            return Err(
                DomainError::validation("customer does not exist for this tenant").into(),
            );
        }
        Ok(())
    }

    fn load(&self, tenant_id: TenantId, number: &DocumentNumber) -> EngineResult<Invoice> {
        self.invoices
            .find(tenant_id, number)?
            .ok_or_else(|| DomainError::not_found().into())
    }
}
