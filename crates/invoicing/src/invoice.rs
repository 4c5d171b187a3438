use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billquill_core::money::clamp_non_negative;
use billquill_core::{CustomerId, DomainError, DomainResult, Entity, TenantId, UserId};
use billquill_numbering::DocumentNumber;
use billquill_pricing::{DocumentRates, FinancialSummary, LineBreakdown, LineItem, PricingOutcome};

/// Invoice status lifecycle.
///
/// `Overdue` is entered only on behalf of an external caller; this engine has
/// no scheduler. `Paid` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// The explicit transition table. Anything not listed is rejected.
    pub fn can_transition(self, to: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, to),
            (Draft, Sent)
                | (Draft, Cancelled)
                | (Sent, PartiallyPaid)
                | (Sent, Paid)
                | (Sent, Overdue)
                | (Sent, Cancelled)
                | (PartiallyPaid, Paid)
                | (PartiallyPaid, Overdue)
                | (PartiallyPaid, Cancelled)
                | (Overdue, PartiallyPaid)
                | (Overdue, Paid)
                | (Overdue, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    /// States in which money can be received against the invoice.
    pub fn accepts_payment(self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent | InvoiceStatus::PartiallyPaid | InvoiceStatus::Overdue
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    CreditCard,
    Cheque,
    Online,
}

/// A payment received against an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub method: PaymentMethod,
}

/// An invoice owned by a tenant account.
///
/// May carry a weak back-reference to the quotation it was converted from.
/// `Paid` freezes the document for edits and deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    number: DocumentNumber,
    tenant_id: TenantId,
    customer_id: CustomerId,
    quotation_number: Option<DocumentNumber>,
    items: Vec<LineItem>,
    rates: DocumentRates,
    summary: FinancialSummary,
    line_breakdowns: Vec<LineBreakdown>,
    status: InvoiceStatus,
    due_date: DateTime<Utc>,
    payments: Vec<Payment>,
    amount_paid: Decimal,
    balance_due: Decimal,
    created_by: UserId,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Invoice {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        number: DocumentNumber,
        tenant_id: TenantId,
        customer_id: CustomerId,
        quotation_number: Option<DocumentNumber>,
        items: Vec<LineItem>,
        rates: DocumentRates,
        pricing: PricingOutcome,
        due_date: DateTime<Utc>,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        let balance_due = pricing.summary.grand_total;
        Self {
            number,
            tenant_id,
            customer_id,
            quotation_number,
            items,
            rates,
            summary: pricing.summary,
            line_breakdowns: pricing.lines,
            status: InvoiceStatus::Draft,
            due_date,
            payments: Vec::new(),
            amount_paid: Decimal::ZERO,
            balance_due,
            created_by,
            created_at,
            sent_at: None,
            paid_at: None,
            cancelled_at: None,
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

    pub fn quotation_number(&self) -> Option<&DocumentNumber> {
        self.quotation_number.as_ref()
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

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn amount_paid(&self) -> Decimal {
        self.amount_paid
    }

    pub fn balance_due(&self) -> Decimal {
        self.balance_due
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

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// `Paid` is terminal for edits.
    pub fn ensure_editable(&self) -> DomainResult<()> {
        if self.status == InvoiceStatus::Paid {
            return Err(DomainError::invalid_state(
                "a paid invoice can no longer be edited",
            ));
        }
        Ok(())
    }

    /// Line items are frozen once the document leaves `Draft`.
    pub fn ensure_items_mutable(&self) -> DomainResult<()> {
        self.ensure_editable()?;
        if self.status != InvoiceStatus::Draft {
            return Err(DomainError::invalid_state(
                "line items can only change while the invoice is a draft",
            ));
        }
        Ok(())
    }

    /// `Paid` is terminal for deletion too.
    pub fn ensure_removable(&self) -> DomainResult<()> {
        if self.status == InvoiceStatus::Paid {
            return Err(DomainError::invalid_state(
                "a paid invoice cannot be deleted",
            ));
        }
        Ok(())
    }

    /// Replace items and rates with a freshly computed pricing outcome.
    /// The balance is rebased against the new grand total.
    ///
    /// A reprice that would owe less than what has already been received is
    /// rejected; `amount_paid <= grand_total` must keep holding, or the
    /// invoice could sit fully settled yet stuck in `PartiallyPaid`.
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
        if pricing.summary.grand_total < self.amount_paid {
            return Err(DomainError::validation(format!(
                "new grand total {} is below the {} already paid",
                pricing.summary.grand_total, self.amount_paid
            )));
        }
        self.items = items;
        self.rates = rates;
        self.summary = pricing.summary;
        self.line_breakdowns = pricing.lines;
        self.balance_due = clamp_non_negative(self.summary.grand_total - self.amount_paid);
        self.touch();
        Ok(())
    }

    pub fn set_due_date(&mut self, due_date: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_editable()?;
        self.due_date = due_date;
        self.touch();
        Ok(())
    }

    /// Apply a status transition, stamping the matching timestamp.
    pub fn transition(&mut self, to: InvoiceStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.can_transition(to) {
            return Err(DomainError::invalid_state(format!(
                "invoice cannot move from {:?} to {to:?}",
                self.status
            )));
        }
        self.status = to;
        match to {
            InvoiceStatus::Sent => self.sent_at = Some(now),
            InvoiceStatus::Paid => self.paid_at = Some(now),
            InvoiceStatus::Cancelled => self.cancelled_at = Some(now),
            _ => {}
        }
        self.touch();
        Ok(())
    }

    /// Record a payment, moving the invoice to `PartiallyPaid` or `Paid`.
    ///
    /// Overpaying is rejected; the balance never goes negative.
    pub fn record_payment(&mut self, payment: Payment, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.accepts_payment() {
            return Err(DomainError::invalid_state(format!(
                "cannot record a payment on a {:?} invoice",
                self.status
            )));
        }
        if payment.amount <= Decimal::ZERO {
            return Err(DomainError::validation("payment amount must be positive"));
        }

        let new_total = self.amount_paid + payment.amount;
        if new_total > self.summary.grand_total {
            return Err(DomainError::validation(format!(
                "payment of {} would exceed the grand total {}",
                payment.amount, self.summary.grand_total
            )));
        }

        self.amount_paid = new_total;
        self.balance_due = clamp_non_negative(self.summary.grand_total - new_total);
        self.payments.push(payment);

        if self.amount_paid >= self.summary.grand_total {
            self.status = InvoiceStatus::Paid;
            self.paid_at = Some(now);
        } else {
            self.status = InvoiceStatus::PartiallyPaid;
        }
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.version += 1;
    }
}

impl Entity for Invoice {
    type Id = DocumentNumber;

    fn id(&self) -> &Self::Id {
        &self.number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billquill_numbering::DocumentKind;
    use billquill_pricing::compute_financials;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn payment(amount: Decimal) -> Payment {
        Payment {
            amount,
            date: test_time(),
            method: PaymentMethod::BankTransfer,
        }
    }

    fn test_invoice() -> Invoice {
        let items = vec![LineItem::new(dec!(2), dec!(100), dec!(40))];
        let rates = DocumentRates::default();
        let pricing = compute_financials(&items, &rates);
        Invoice::new(
            DocumentNumber::new(DocumentKind::Invoice, 1),
            TenantId::new(),
            CustomerId::new(),
            None,
            items,
            rates,
            pricing,
            test_time() + Duration::days(30),
            UserId::new(),
            test_time(),
        )
    }

    #[test]
    fn new_invoice_is_a_draft_owing_the_grand_total() {
        let inv = test_invoice();
        assert_eq!(inv.status(), InvoiceStatus::Draft);
        assert_eq!(inv.summary().grand_total, dec!(200));
        assert_eq!(inv.amount_paid(), dec!(0));
        assert_eq!(inv.balance_due(), dec!(200));
    }

    #[test]
    fn partial_payments_accumulate_until_paid() {
        let mut inv = test_invoice();
        let now = test_time();
        inv.transition(InvoiceStatus::Sent, now).unwrap();

        inv.record_payment(payment(dec!(50)), now).unwrap();
        assert_eq!(inv.status(), InvoiceStatus::PartiallyPaid);
        assert_eq!(inv.amount_paid(), dec!(50));
        assert_eq!(inv.balance_due(), dec!(150));

        inv.record_payment(payment(dec!(150)), now).unwrap();
        assert_eq!(inv.status(), InvoiceStatus::Paid);
        assert_eq!(inv.balance_due(), dec!(0));
        assert_eq!(inv.paid_at(), Some(now));
        assert_eq!(inv.payments().len(), 2);
    }

    #[test]
    fn overpayment_is_rejected() {
        let mut inv = test_invoice();
        let now = test_time();
        inv.transition(InvoiceStatus::Sent, now).unwrap();

        let err = inv.record_payment(payment(dec!(200.01)), now).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(inv.amount_paid(), dec!(0));
    }

    #[test]
    fn payments_require_a_receivable_status() {
        let mut inv = test_invoice();
        let now = test_time();

        // Draft does not accept money.
        let err = inv.record_payment(payment(dec!(10)), now).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));

        inv.transition(InvoiceStatus::Cancelled, now).unwrap();
        let err = inv.record_payment(payment(dec!(10)), now).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn paid_invoice_rejects_update_and_removal() {
        let mut inv = test_invoice();
        let now = test_time();
        inv.transition(InvoiceStatus::Sent, now).unwrap();
        inv.record_payment(payment(dec!(200)), now).unwrap();
        assert_eq!(inv.status(), InvoiceStatus::Paid);

        assert!(matches!(
            inv.ensure_editable(),
            Err(DomainError::InvalidState(_))
        ));
        assert!(matches!(
            inv.ensure_removable(),
            Err(DomainError::InvalidState(_))
        ));
    }

    #[test]
    fn transition_table_rejects_unreachable_states() {
        let mut inv = test_invoice();
        let now = test_time();

        // Draft cannot jump straight to Paid or Overdue.
        assert!(inv.transition(InvoiceStatus::Paid, now).is_err());
        assert!(inv.transition(InvoiceStatus::Overdue, now).is_err());

        inv.transition(InvoiceStatus::Sent, now).unwrap();
        inv.transition(InvoiceStatus::Overdue, now).unwrap();
        // Overdue can still be settled.
        inv.record_payment(payment(dec!(200)), now).unwrap();
        assert_eq!(inv.status(), InvoiceStatus::Paid);

        // Paid is terminal.
        assert!(inv.transition(InvoiceStatus::Cancelled, now).is_err());
    }

    #[test]
    fn repricing_rebases_the_balance() {
        let mut inv = test_invoice();
        let items = vec![LineItem::new(dec!(1), dec!(500), dec!(100))];
        let pricing = compute_financials(&items, &DocumentRates::default());
        inv.reprice(items, DocumentRates::default(), pricing).unwrap();

        assert_eq!(inv.summary().grand_total, dec!(500));
        assert_eq!(inv.balance_due(), dec!(500));
    }

    #[test]
    fn repricing_below_the_amount_already_paid_is_rejected() {
        let mut inv = test_invoice(); // grand total 200
        let now = test_time();
        inv.transition(InvoiceStatus::Sent, now).unwrap();
        inv.record_payment(payment(dec!(100)), now).unwrap();
        assert_eq!(inv.status(), InvoiceStatus::PartiallyPaid);

        // A rates-only reprice dropping the grand total to 50 would leave
        // amount_paid above what is owed.
        let rates = DocumentRates {
            discount: dec!(150),
            ..DocumentRates::default()
        };
        let items = inv.items().to_vec();
        let pricing = compute_financials(&items, &rates);
        assert_eq!(pricing.summary.grand_total, dec!(50));

        let err = inv.reprice(items, rates, pricing).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        // The invoice is untouched.
        assert_eq!(inv.summary().grand_total, dec!(200));
        assert_eq!(inv.amount_paid(), dec!(100));
        assert_eq!(inv.balance_due(), dec!(100));

        // Repricing down to exactly the paid amount is still allowed.
        let rates = DocumentRates {
            discount: dec!(100),
            ..DocumentRates::default()
        };
        let items = inv.items().to_vec();
        let pricing = compute_financials(&items, &rates);
        inv.reprice(items, rates, pricing).unwrap();
        assert_eq!(inv.summary().grand_total, dec!(100));
        assert_eq!(inv.balance_due(), dec!(0));
        // Settled by the rebase; the explicit transition closes it out.
        inv.transition(InvoiceStatus::Paid, now).unwrap();
        assert_eq!(inv.status(), InvoiceStatus::Paid);
    }

    #[test]
    fn items_are_frozen_once_sent() {
        let mut inv = test_invoice();
        inv.transition(InvoiceStatus::Sent, test_time()).unwrap();

        let items = vec![LineItem::new(dec!(9), dec!(9), dec!(9))];
        let pricing = compute_financials(&items, &DocumentRates::default());
        let err = inv
            .reprice(items, DocumentRates::default(), pricing)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }
}
