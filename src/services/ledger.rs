use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::{new_document_id, Flat, Invoice, InvoiceStatus, PaymentLog},
    schemas::{non_empty_opt, CreateInvoiceInput, MarkInvoicePaidInput, RecordPaymentInput},
    services::arrears::round2,
};

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub is_overdue: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvoiceSummary {
    pub outstanding: f64,
    pub overdue: f64,
    pub paid: f64,
}

pub fn issue_invoice(
    flat: &mut Flat,
    input: &CreateInvoiceInput,
    now: DateTime<Utc>,
) -> AppResult<Invoice> {
    if !flat.has_tenant() {
        return Err(AppError::Conflict(
            "Flat has no tenant to invoice.".to_string(),
        ));
    }
    let amount = input
        .amount
        .ok_or_else(|| AppError::BadRequest("amount is required.".to_string()))?;
    let due_date = input
        .due_date
        .ok_or_else(|| AppError::BadRequest("due_date is required.".to_string()))?;

    let invoice = Invoice {
        id: new_document_id(),
        amount: round2(amount),
        description: non_empty_opt(input.description.as_deref()),
        issued_at: now,
        due_date,
        status: InvoiceStatus::Pending,
        paid_at: None,
    };
    flat.invoices.push(invoice.clone());
    Ok(invoice)
}

/// Appends a payment log; a linked invoice must be pending and becomes paid.
pub fn record_payment(
    flat: &mut Flat,
    input: &RecordPaymentInput,
    now: DateTime<Utc>,
) -> AppResult<PaymentLog> {
    let amount = input
        .amount
        .ok_or_else(|| AppError::BadRequest("amount is required.".to_string()))?;
    let paid_at = input.paid_at.unwrap_or(now);
    let invoice_id = non_empty_opt(input.invoice_id.as_deref());

    if let Some(invoice_id) = invoice_id.as_deref() {
        let invoice = flat
            .invoice_mut(invoice_id)
            .ok_or_else(|| AppError::NotFound("Invoice not found.".to_string()))?;
        ensure_pending(invoice)?;
        invoice.status = InvoiceStatus::Paid;
        invoice.paid_at = Some(paid_at);
    }

    let payment = PaymentLog {
        id: new_document_id(),
        amount: round2(amount),
        paid_at,
        method: input.method.unwrap_or_default(),
        reference: non_empty_opt(input.reference.as_deref()),
        invoice_id,
        notes: non_empty_opt(input.notes.as_deref()),
        recorded_at: now,
    };
    flat.payment_logs.push(payment.clone());
    Ok(payment)
}

/// Records a payment for the full invoice amount.
pub fn mark_invoice_paid(
    flat: &mut Flat,
    invoice_id: &str,
    input: &MarkInvoicePaidInput,
    now: DateTime<Utc>,
) -> AppResult<PaymentLog> {
    let amount = flat
        .invoices
        .iter()
        .find(|invoice| invoice.id == invoice_id)
        .map(|invoice| invoice.amount)
        .ok_or_else(|| AppError::NotFound("Invoice not found.".to_string()))?;

    record_payment(
        flat,
        &RecordPaymentInput {
            amount: Some(amount),
            paid_at: input.paid_at,
            method: input.method,
            reference: input.reference.clone(),
            invoice_id: Some(invoice_id.to_string()),
            notes: input.notes.clone(),
        },
        now,
    )
}

pub fn cancel_invoice(flat: &mut Flat, invoice_id: &str) -> AppResult<Invoice> {
    let invoice = flat
        .invoice_mut(invoice_id)
        .ok_or_else(|| AppError::NotFound("Invoice not found.".to_string()))?;
    ensure_pending(invoice)?;
    invoice.status = InvoiceStatus::Cancelled;
    Ok(invoice.clone())
}

pub fn invoice_views(flat: &Flat, now: DateTime<Utc>) -> Vec<InvoiceView> {
    let mut views = flat
        .invoices
        .iter()
        .map(|invoice| InvoiceView {
            invoice: invoice.clone(),
            is_overdue: invoice.is_overdue(now),
        })
        .collect::<Vec<_>>();
    views.sort_by(|left, right| right.invoice.due_date.cmp(&left.invoice.due_date));
    views
}

pub fn summarize_invoices(flat: &Flat, now: DateTime<Utc>) -> InvoiceSummary {
    let mut summary = flat
        .invoices
        .iter()
        .fold(InvoiceSummary::default(), |mut summary, invoice| {
            match invoice.status {
                InvoiceStatus::Pending => {
                    summary.outstanding += invoice.amount;
                    if invoice.is_overdue(now) {
                        summary.overdue += invoice.amount;
                    }
                }
                InvoiceStatus::Paid => summary.paid += invoice.amount,
                InvoiceStatus::Cancelled => {}
            }
            summary
        });
    summary.outstanding = round2(summary.outstanding);
    summary.overdue = round2(summary.overdue);
    summary.paid = round2(summary.paid);
    summary
}

pub fn payments_newest_first(flat: &Flat) -> Vec<PaymentLog> {
    let mut payments = flat.payment_logs.clone();
    payments.sort_by(|left, right| right.paid_at.cmp(&left.paid_at));
    payments
}

fn ensure_pending(invoice: &Invoice) -> AppResult<()> {
    if invoice.status == InvoiceStatus::Pending {
        return Ok(());
    }
    Err(AppError::Conflict(format!(
        "Invoice is already {}.",
        invoice.status.as_str()
    )))
}

#[cfg(test)]
mod tests {
    use super::{
        cancel_invoice, invoice_views, issue_invoice, mark_invoice_paid, payments_newest_first,
        record_payment, summarize_invoices, InvoiceSummary,
    };
    use crate::{
        error::AppError,
        models::{Flat, InvoiceStatus, PaymentMethod, TenantSnapshot},
        schemas::{CreateInvoiceInput, MarkInvoicePaidInput, RecordPaymentInput},
    };
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).single().expect("valid time")
    }

    fn tenanted_flat() -> Flat {
        let mut flat = Flat::from_row(json!({
            "id": "f-1",
            "owner_id": "user-1",
            "name": "Flat",
            "address": "1 High St"
        }))
        .expect("flat should parse");
        flat.assign_tenant(TenantSnapshot {
            tenant_id: Some("t-1".to_string()),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            lease_start: None,
            lease_end: None,
            monthly_rent: Some(950.0),
        });
        flat
    }

    fn invoice_input(amount: f64, due: DateTime<Utc>) -> CreateInvoiceInput {
        CreateInvoiceInput {
            amount: Some(amount),
            due_date: Some(due),
            description: Some("October rent".to_string()),
        }
    }

    #[test]
    fn vacant_flat_cannot_be_invoiced() {
        let mut flat = tenanted_flat();
        flat.vacate();
        let result = issue_invoice(&mut flat, &invoice_input(950.0, now()), now());
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(flat.invoices.is_empty());
    }

    #[test]
    fn linked_payment_settles_invoice_once() {
        let now = now();
        let mut flat = tenanted_flat();
        let invoice = issue_invoice(&mut flat, &invoice_input(950.0, now + Duration::days(7)), now)
            .expect("invoice should issue");

        let payment = record_payment(
            &mut flat,
            &RecordPaymentInput {
                amount: Some(950.0),
                invoice_id: Some(invoice.id.clone()),
                reference: Some("  ".to_string()),
                ..RecordPaymentInput::default()
            },
            now,
        )
        .expect("payment should record");
        assert_eq!(payment.method, PaymentMethod::BankTransfer);
        assert_eq!(payment.reference, None);
        assert_eq!(flat.invoices[0].status, InvoiceStatus::Paid);
        assert_eq!(flat.invoices[0].paid_at, Some(now));

        let again = mark_invoice_paid(&mut flat, &invoice.id, &MarkInvoicePaidInput::default(), now);
        assert!(matches!(again, Err(AppError::Conflict(message)) if message.contains("paid")));
        assert_eq!(flat.payment_logs.len(), 1);
    }

    #[test]
    fn unknown_invoice_is_not_found() {
        let mut flat = tenanted_flat();
        let result = record_payment(
            &mut flat,
            &RecordPaymentInput {
                amount: Some(10.0),
                invoice_id: Some("missing".to_string()),
                ..RecordPaymentInput::default()
            },
            now(),
        );
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(flat.payment_logs.is_empty());
        assert!(matches!(
            cancel_invoice(&mut flat, "missing"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn mark_paid_uses_invoice_amount() {
        let now = now();
        let mut flat = tenanted_flat();
        let invoice = issue_invoice(&mut flat, &invoice_input(1234.5, now), now)
            .expect("invoice should issue");

        let payment = mark_invoice_paid(
            &mut flat,
            &invoice.id,
            &MarkInvoicePaidInput {
                method: Some(PaymentMethod::Card),
                ..MarkInvoicePaidInput::default()
            },
            now,
        )
        .expect("invoice should be paid");
        assert_eq!(payment.amount, 1234.5);
        assert_eq!(payment.invoice_id.as_deref(), Some(invoice.id.as_str()));
        assert_eq!(payment.method, PaymentMethod::Card);
    }

    #[test]
    fn cancelled_invoice_cannot_be_paid() {
        let now = now();
        let mut flat = tenanted_flat();
        let invoice = issue_invoice(&mut flat, &invoice_input(100.0, now), now)
            .expect("invoice should issue");
        let cancelled = cancel_invoice(&mut flat, &invoice.id).expect("invoice should cancel");
        assert_eq!(cancelled.status, InvoiceStatus::Cancelled);

        let result = mark_invoice_paid(&mut flat, &invoice.id, &MarkInvoicePaidInput::default(), now);
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn summary_splits_outstanding_overdue_and_paid() {
        let now = now();
        let mut flat = tenanted_flat();
        issue_invoice(&mut flat, &invoice_input(100.1, now - Duration::days(3)), now)
            .expect("overdue invoice");
        issue_invoice(&mut flat, &invoice_input(200.2, now + Duration::days(3)), now)
            .expect("upcoming invoice");
        let settled = issue_invoice(&mut flat, &invoice_input(300.0, now - Duration::days(30)), now)
            .expect("settled invoice");
        mark_invoice_paid(&mut flat, &settled.id, &MarkInvoicePaidInput::default(), now)
            .expect("payment");

        assert_eq!(
            summarize_invoices(&flat, now),
            InvoiceSummary {
                outstanding: 300.3,
                overdue: 100.1,
                paid: 300.0,
            }
        );

        let views = invoice_views(&flat, now);
        assert_eq!(views.len(), 3);
        assert!(!views[0].is_overdue);
        assert!(views[1].is_overdue);
        assert!(!views[2].is_overdue);
    }

    #[test]
    fn payments_are_listed_newest_first() {
        let now = now();
        let mut flat = tenanted_flat();
        for days_ago in [10, 1, 5] {
            record_payment(
                &mut flat,
                &RecordPaymentInput {
                    amount: Some(10.0),
                    paid_at: Some(now - Duration::days(days_ago)),
                    ..RecordPaymentInput::default()
                },
                now,
            )
            .expect("payment should record");
        }
        let ordered = payments_newest_first(&flat)
            .iter()
            .map(|payment| (now - payment.paid_at).num_days())
            .collect::<Vec<_>>();
        assert_eq!(ordered, vec![1, 5, 10]);
    }
}
