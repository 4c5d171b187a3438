use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billquill_core::{CustomerId, DomainError, DomainResult, Entity, TenantId, UserId};
use billquill_numbering::DocumentNumber;
use billquill_pricing::{DocumentRates, FinancialSummary, LineBreakdown, LineItem, PricingOutcome};

/// Quotation status lifecycle.
///
/// Draft -> Sent -> Accepted | Rejected | Expired. The three outcomes are
/// terminal; a converted quotation is additionally frozen by its flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
}

impl QuotationStatus {
    /// The explicit transition table. Anything not listed is rejected.
    pub fn can_transition(self, to: QuotationStatus) -> bool {
        use QuotationStatus::*;
        matches!(
            (self, to),
            (Draft, Sent) | (Sent, Accepted) | (Sent, Rejected) | (Sent, Expired)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QuotationStatus::Accepted | QuotationStatus::Rejected | QuotationStatus::Expired
        )
    }
}

/// A quotation owned by a tenant account.
///
/// Mutable only while `Draft` or `Sent` and not yet converted; line items are
/// frozen as soon as the document leaves `Draft`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    number: DocumentNumber,
    tenant_id: TenantId,
    customer_id: CustomerId,
    items: Vec<LineItem>,
    rates: DocumentRates,
    summary: FinancialSummary,
    line_breakdowns: Vec<LineBreakdown>,
    status: QuotationStatus,
    converted_to_invoice: bool,
    valid_until: Option<DateTime<Utc>>,
    created_by: UserId,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    accepted_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
    expired_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Quotation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        number: DocumentNumber,
        tenant_id: TenantId,
        customer_id: CustomerId,
        items: Vec<LineItem>,
        rates: DocumentRates,
        pricing: PricingOutcome,
        valid_until: Option<DateTime<Utc>>,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            number,
            tenant_id,
            customer_id,
            items,
            rates,
            summary: pricing.summary,
            line_breakdowns: pricing.lines,
            status: QuotationStatus::Draft,
            converted_to_invoice: false,
            valid_until,
            created_by,
            created_at,
            sent_at: None,
            accepted_at: None,
            rejected_at: None,
            expired_at: None,
            version: 1,
        }
    }

    pub fn number(&self) -> &DocumentNumber {
        &self.number
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn rates(&self) -> &DocumentRates {
        &self.rates
    }

    pub fn summary(&self) -> &FinancialSummary {
        &self.summary
    }

    pub fn line_breakdowns(&self) -> &[LineBreakdown] {
        &self.line_breakdowns
    }

    pub fn status(&self) -> QuotationStatus {
        self.status
    }

    pub fn converted_to_invoice(&self) -> bool {
        self.converted_to_invoice
    }

    pub fn valid_until(&self) -> Option<DateTime<Utc>> {
        self.valid_until
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    pub fn accepted_at(&self) -> Option<DateTime<Utc>> {
        self.accepted_at
    }

    pub fn rejected_at(&self) -> Option<DateTime<Utc>> {
        self.rejected_at
    }

    pub fn expired_at(&self) -> Option<DateTime<Utc>> {
        self.expired_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Guard for `update`: a converted or accepted quotation conflicts, any
    /// other terminal status is an invalid state.
    pub fn ensure_editable(&self) -> DomainResult<()> {
        if self.converted_to_invoice {
            return Err(DomainError::conflict(
                "quotation has already been converted to an invoice",
            ));
        }
        if self.status == QuotationStatus::Accepted {
            return Err(DomainError::conflict("quotation has been accepted"));
        }
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(format!(
                "quotation is {:?} and can no longer be edited",
                self.status
            )));
        }
        Ok(())
    }

    /// Line items are frozen once the document leaves `Draft`.
    pub fn ensure_items_mutable(&self) -> DomainResult<()> {
        self.ensure_editable()?;
        if self.status != QuotationStatus::Draft {
            return Err(DomainError::invalid_state(
                "line items can only change while the quotation is a draft",
            ));
        }
        Ok(())
    }

    pub fn ensure_removable(&self) -> DomainResult<()> {
        if self.converted_to_invoice {
            return Err(DomainError::conflict(
                "quotation has already been converted to an invoice",
            ));
        }
        if self.status == QuotationStatus::Accepted {
            return Err(DomainError::conflict("quotation has been accepted"));
        }
        Ok(())
    }

    /// Both conversion-eligible states; anything else is rejected before the
    /// coordinator does any work.
    pub fn ensure_convertible(&self) -> DomainResult<()> {
        if self.converted_to_invoice {
            return Err(DomainError::conflict(
                "quotation has already been converted to an invoice",
            ));
        }
        if !matches!(self.status, QuotationStatus::Sent | QuotationStatus::Accepted) {
            return Err(DomainError::invalid_state(format!(
                "only sent or accepted quotations can be converted, not {:?}",
                self.status
            )));
        }
        Ok(())
    }

    /// Replace items and rates with a freshly computed pricing outcome.
    pub fn reprice(
        &mut self,
        items: Vec<LineItem>,
        rates: DocumentRates,
        pricing: PricingOutcome,
    ) -> DomainResult<()> {
        if items != self.items {
            self.ensure_items_mutable()?;
        } else {
            self.ensure_editable()?;
        }
        self.items = items;
        self.rates = rates;
        self.summary = pricing.summary;
        self.line_breakdowns = pricing.lines;
        self.touch();
        Ok(())
    }

    pub fn set_valid_until(&mut self, valid_until: Option<DateTime<Utc>>) -> DomainResult<()> {
        self.ensure_editable()?;
        self.valid_until = valid_until;
        self.touch();
        Ok(())
    }

    /// Apply a status transition, stamping the matching timestamp.
    pub fn transition(&mut self, to: QuotationStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.can_transition(to) {
            return Err(DomainError::invalid_state(format!(
                "quotation cannot move from {:?} to {to:?}",
                self.status
            )));
        }
        self.status = to;
        match to {
            QuotationStatus::Sent => self.sent_at = Some(now),
            QuotationStatus::Accepted => self.accepted_at = Some(now),
            QuotationStatus::Rejected => self.rejected_at = Some(now),
            QuotationStatus::Expired => self.expired_at = Some(now),
            QuotationStatus::Draft => {}
        }
        self.touch();
        Ok(())
    }

    /// Flip the one-way conversion flag. The quotation ends up `Accepted`.
    pub fn mark_converted(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_convertible()?;
        self.mark_invoiced(now)
    }

    /// Flip the flag when an invoice is raised directly against this
    /// quotation. Only the flag guards this path (any status qualifies);
    /// the status still catches up to `Accepted`.
    pub fn mark_invoiced(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.converted_to_invoice {
            return Err(DomainError::conflict(
                "quotation has already been converted to an invoice",
            ));
        }
        self.converted_to_invoice = true;
        if self.status != QuotationStatus::Accepted {
            self.status = QuotationStatus::Accepted;
            self.accepted_at = Some(now);
        }
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.version += 1;
    }
}

impl Entity for Quotation {
    type Id = DocumentNumber;

    fn id(&self) -> &Self::Id {
        &self.number
    }
}
