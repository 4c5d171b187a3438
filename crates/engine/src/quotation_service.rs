//! Quotation lifecycle service.

use chrono::{DateTime, Utc};
use tracing::info;

use billquill_core::{CustomerId, DomainError, ExpectedVersion, TenantId, UserId};
use billquill_events::EventBus;
use billquill_numbering::{DocumentKind, DocumentNumber, SequenceProvider};
use billquill_pricing::{DocumentRates, LineItem, PricingWarning, compute_financials};
use billquill_quotations::{Quotation, QuotationStatus};

use crate::error::EngineResult;
use crate::hooks::{DocumentEvent, HookEnvelope, emit};
use crate::store::{Directory, QuotationStore};

/// Input for creating a quotation.
#[derive(Debug, Clone)]
pub struct NewQuotation {
    pub customer_id: CustomerId,
    pub items: Vec<LineItem>,
    pub rates: DocumentRates,
    pub valid_until: Option<DateTime<Utc>>,
}

/// Partial update. `None` fields are left untouched; `valid_until` is doubly
/// optional so it can be cleared.
#[derive(Debug, Clone, Default)]
pub struct QuotationPatch {
    pub items: Option<Vec<LineItem>>,
    pub rates: Option<DocumentRates>,
    pub valid_until: Option<Option<DateTime<Utc>>>,
}

/// Orchestrates quotation operations: referential checks, pricing, number
/// allocation, persistence, hooks. All domain rules live on [`Quotation`]
/// itself; this service sequences them.
pub struct QuotationService<S, D, N, B>
where
    S: QuotationStore,
    D: Directory,
    N: SequenceProvider,
    B: EventBus<HookEnvelope>,
{
    store: S,
    directory: D,
    sequences: N,
    hooks: B,
}

impl<S, D, N, B> QuotationService<S, D, N, B>
where
    S: QuotationStore,
    D: Directory,
    N: SequenceProvider,
    B: EventBus<HookEnvelope>,
{
    pub fn new(store: S, directory: D, sequences: N, hooks: B) -> Self {
        Self {
            store,
            directory,
            sequences,
            hooks,
        }
    }

    /// Create a quotation as `Draft`, with a freshly allocated number and a
    /// fully computed financial summary. Sanitization warnings from pricing
    /// are returned to the caller.
    pub fn create(
        &self,
        tenant_id: TenantId,
        created_by: UserId,
        input: NewQuotation,
    ) -> EngineResult<(Quotation, Vec<PricingWarning>)> {
        self.check_references(tenant_id, input.customer_id)?;

        let mut outcome = compute_financials(&input.items, &input.rates);
        let warnings = std::mem::take(&mut outcome.warnings);

        let number = self.sequences.next(tenant_id, DocumentKind::Quotation)?;
        let now = Utc::now();
        let quotation = Quotation::new(
            number,
            tenant_id,
            input.customer_id,
            input.items,
            input.rates,
            outcome,
            input.valid_until,
            created_by,
            now,
        );

        self.store.insert(quotation.clone())?;
        info!(tenant = %tenant_id, number = %quotation.number(), "quotation created");
        emit(
            &self.hooks,
            HookEnvelope::new(
                tenant_id,
                DocumentKind::Quotation,
                quotation.number().clone(),
                DocumentEvent::QuotationCreated { occurred_at: now },
            ),
        );
        Ok((quotation, warnings))
    }

    pub fn get(&self, tenant_id: TenantId, number: &DocumentNumber) -> EngineResult<Quotation> {
        self.load(tenant_id, number)
    }

    pub fn list(&self, tenant_id: TenantId) -> EngineResult<Vec<Quotation>> {
        Ok(self.store.list(tenant_id)?)
    }

    /// Apply a patch and recompute financials if items or rates changed.
    pub fn update(
        &self,
        tenant_id: TenantId,
        number: &DocumentNumber,
        patch: QuotationPatch,
    ) -> EngineResult<(Quotation, Vec<PricingWarning>)> {
        let mut quotation = self.load(tenant_id, number)?;
        let expected = ExpectedVersion::Exact(quotation.version());

        let mut warnings = Vec::new();
        if patch.items.is_some() || patch.rates.is_some() {
            let items = patch.items.unwrap_or_else(|| quotation.items().to_vec());
            let rates = patch.rates.unwrap_or_else(|| quotation.rates().clone());
            let mut outcome = compute_financials(&items, &rates);
            warnings = std::mem::take(&mut outcome.warnings);
            quotation.reprice(items, rates, outcome)?;
        }
        if let Some(valid_until) = patch.valid_until {
            quotation.set_valid_until(valid_until)?;
        }

        self.store.update(quotation.clone(), expected)?;
        emit(
            &self.hooks,
            HookEnvelope::new(
                tenant_id,
                DocumentKind::Quotation,
                quotation.number().clone(),
                DocumentEvent::QuotationUpdated {
                    occurred_at: Utc::now(),
                },
            ),
        );
        Ok((quotation, warnings))
    }

    /// Move the quotation through its status machine.
    pub fn update_status(
        &self,
        tenant_id: TenantId,
        number: &DocumentNumber,
        status: QuotationStatus,
    ) -> EngineResult<Quotation> {
        let mut quotation = self.load(tenant_id, number)?;
        let expected = ExpectedVersion::Exact(quotation.version());
        let from = quotation.status();
        let now = Utc::now();

        quotation.transition(status, now)?;
        self.store.update(quotation.clone(), expected)?;
        info!(tenant = %tenant_id, number = %quotation.number(), ?from, to = ?status, "quotation status changed");
        emit(
            &self.hooks,
            HookEnvelope::new(
                tenant_id,
                DocumentKind::Quotation,
                quotation.number().clone(),
                DocumentEvent::QuotationStatusChanged {
                    from,
                    to: status,
                    occurred_at: now,
                },
            ),
        );
        Ok(quotation)
    }

    /// Delete a quotation. Converted or accepted quotations refuse.
    pub fn remove(&self, tenant_id: TenantId, number: &DocumentNumber) -> EngineResult<()> {
        let quotation = self.load(tenant_id, number)?;
        quotation.ensure_removable()?;

        self.store.remove(tenant_id, number)?;
        emit(
            &self.hooks,
            HookEnvelope::new(
                tenant_id,
                DocumentKind::Quotation,
                number.clone(),
                DocumentEvent::QuotationDeleted {
                    occurred_at: Utc::now(),
                },
            ),
        );
        Ok(())
    }

    /// Seed the number counter from the highest persisted number, so a
    /// restarted process continues the tenant's sequence.
    pub fn restore_sequence(&self, tenant_id: TenantId) -> EngineResult<()> {
        if let Some(last) = self.store.last_number(tenant_id)? {
            self.sequences
                .seed(tenant_id, DocumentKind::Quotation, &last)?;
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

    fn load(&self, tenant_id: TenantId, number: &DocumentNumber) -> EngineResult<Quotation> {
        self.store
            .find(tenant_id, number)?
            .ok_or_else(|| DomainError::not_found().into())
    }
}
